//! Matching paths against patterns and building paths from patterns

use crate::pattern::{parse, Modifier, Token};
use regex::{Regex, RegexBuilder};
use shim_core::{Result, RouteMatch, RouteMatcher, ShimError};
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex};
use tracing::trace;

const SEGMENT: &str = "[^/]+";
const SEGMENTS: &str = "[^/]+(?:/[^/]+)*";

/// Matching behaviour, mirroring the usual router switches
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MatchOptions {
    /// Case-sensitive literal matching
    pub sensitive: bool,
    /// When false, a single trailing `/` is tolerated
    pub strict: bool,
    /// When false, the pattern only has to match a prefix ending on a segment boundary
    pub end: bool,
}

impl Default for MatchOptions {
    fn default() -> Self {
        Self {
            sensitive: false,
            strict: false,
            end: true,
        }
    }
}

impl MatchOptions {
    pub fn prefix() -> Self {
        Self {
            end: false,
            ..Self::default()
        }
    }
}

/// A parsed pattern with its regex and capture names
#[derive(Debug)]
struct CompiledPattern {
    tokens: Vec<Token>,
    regex: Regex,
    keys: Vec<String>,
}

/// The built-in [`RouteMatcher`]
///
/// Compiled patterns are cached, so matching the same pattern repeatedly only
/// parses it once.
#[derive(Debug, Default)]
pub struct PatternMatcher {
    options: MatchOptions,
    cache: Mutex<HashMap<String, Arc<CompiledPattern>>>,
}

impl PatternMatcher {
    pub fn new(options: MatchOptions) -> Self {
        Self {
            options,
            cache: Mutex::new(HashMap::new()),
        }
    }

    pub fn options(&self) -> MatchOptions {
        self.options
    }

    fn compiled(&self, pattern: &str) -> Result<Arc<CompiledPattern>> {
        let mut cache = self.cache.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(hit) = cache.get(pattern) {
            return Ok(Arc::clone(hit));
        }

        let compiled = Arc::new(self.compile_pattern(pattern)?);
        cache.insert(pattern.to_string(), Arc::clone(&compiled));
        Ok(compiled)
    }

    fn compile_pattern(&self, pattern: &str) -> Result<CompiledPattern> {
        let tokens = parse(pattern)?;
        let mut source = String::from("^");
        let mut keys = Vec::new();

        for token in &tokens {
            match token {
                Token::Literal(text) => source.push_str(&regex::escape(text)),
                Token::Param {
                    name,
                    prefix,
                    modifier,
                } => {
                    keys.push(name.clone());
                    let prefix = regex::escape(prefix);
                    let body = if modifier.is_repeated() { SEGMENTS } else { SEGMENT };
                    if modifier.is_optional() {
                        source.push_str(&format!("(?:{}({}))?", prefix, body));
                    } else {
                        source.push_str(&format!("{}({})", prefix, body));
                    }
                }
            }
        }

        if !self.options.strict && !pattern.ends_with('/') {
            source.push_str("/?");
        }
        if self.options.end {
            source.push('$');
        }

        let regex = RegexBuilder::new(&source)
            .case_insensitive(!self.options.sensitive)
            .build()
            .map_err(|e| ShimError::InvalidPattern {
                pattern: pattern.to_string(),
                reason: e.to_string(),
            })?;

        trace!(pattern, regex = %regex, "compiled route pattern");

        Ok(CompiledPattern {
            tokens,
            regex,
            keys,
        })
    }
}

fn decode(value: &str) -> String {
    urlencoding::decode(value)
        .map(|v| v.into_owned())
        .unwrap_or_else(|_| value.to_string())
}

fn encode_segments(value: &str) -> String {
    value
        .split('/')
        .map(|segment| urlencoding::encode(segment).into_owned())
        .collect::<Vec<_>>()
        .join("/")
}

impl RouteMatcher for PatternMatcher {
    fn match_path(&self, pattern: &str, path: &str) -> Result<Option<RouteMatch>> {
        let compiled = self.compiled(pattern)?;

        let Some(caps) = compiled.regex.captures(path) else {
            return Ok(None);
        };
        let Some(whole) = caps.get(0) else {
            return Ok(None);
        };

        if !self.options.end {
            let rest = &path[whole.end()..];
            let on_boundary =
                rest.is_empty() || rest.starts_with('/') || whole.as_str().ends_with('/');
            if !on_boundary {
                return Ok(None);
            }
        }

        let params = compiled
            .keys
            .iter()
            .enumerate()
            .filter_map(|(i, key)| caps.get(i + 1).map(|m| (key.clone(), decode(m.as_str()))))
            .collect::<BTreeMap<_, _>>();

        Ok(Some(RouteMatch {
            path: whole.as_str().to_string(),
            params,
        }))
    }

    fn compile_path(&self, pattern: &str, params: &BTreeMap<String, String>) -> Result<String> {
        let compiled = self.compiled(pattern)?;
        let mut out = String::new();

        for token in &compiled.tokens {
            match token {
                Token::Literal(text) => out.push_str(text),
                Token::Param {
                    name,
                    prefix,
                    modifier,
                } => {
                    let value = params.get(name).filter(|v| {
                        // an empty zero-or-more value is the same as absent
                        !(v.is_empty() && *modifier == Modifier::ZeroOrMore)
                    });

                    let Some(value) = value else {
                        if modifier.is_optional() {
                            continue;
                        }
                        return Err(ShimError::MissingParam(name.clone()));
                    };

                    let encoded = if modifier.is_repeated() {
                        encode_segments(value.trim_matches('/'))
                    } else {
                        urlencoding::encode(value).into_owned()
                    };

                    if encoded.is_empty() || encoded.split('/').any(str::is_empty) {
                        return Err(ShimError::InvalidParam {
                            name: name.clone(),
                            value: value.clone(),
                        });
                    }

                    out.push_str(prefix);
                    out.push_str(&encoded);
                }
            }
        }

        if out.is_empty() {
            out.push('/');
        }

        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn default_matcher() -> PatternMatcher {
        PatternMatcher::new(MatchOptions::default())
    }

    #[test]
    fn test_match_static() {
        let m = default_matcher();
        let hit = m.match_path("/api/status", "/api/status").unwrap().unwrap();
        assert_eq!(hit.path, "/api/status");
        assert!(hit.params.is_empty());
        assert!(m.match_path("/api/status", "/api/other").unwrap().is_none());
    }

    #[test]
    fn test_match_extracts_params() {
        let m = default_matcher();
        let hit = m
            .match_path("/users/:id/posts/:post", "/users/42/posts/hello%20world")
            .unwrap()
            .unwrap();
        assert_eq!(hit.params, params(&[("id", "42"), ("post", "hello world")]));
    }

    #[test]
    fn test_match_trailing_slash() {
        let loose = default_matcher();
        assert!(loose.match_path("/users/:id", "/users/7/").unwrap().is_some());

        let strict = PatternMatcher::new(MatchOptions {
            strict: true,
            ..MatchOptions::default()
        });
        assert!(strict.match_path("/users/:id", "/users/7/").unwrap().is_none());
        assert!(strict.match_path("/users/:id", "/users/7").unwrap().is_some());
    }

    #[test]
    fn test_match_case_sensitivity() {
        assert!(default_matcher()
            .match_path("/API/Status", "/api/status")
            .unwrap()
            .is_some());

        let sensitive = PatternMatcher::new(MatchOptions {
            sensitive: true,
            ..MatchOptions::default()
        });
        assert!(sensitive
            .match_path("/API/Status", "/api/status")
            .unwrap()
            .is_none());
    }

    #[test]
    fn test_match_optional_param() {
        let m = default_matcher();
        let without = m.match_path("/agents/:id?", "/agents").unwrap().unwrap();
        assert!(without.params.is_empty());

        let with = m.match_path("/agents/:id?", "/agents/a1").unwrap().unwrap();
        assert_eq!(with.params, params(&[("id", "a1")]));
    }

    #[test]
    fn test_match_repeated_params() {
        let m = default_matcher();
        let hit = m
            .match_path("/files/:path+", "/files/a/b/c.txt")
            .unwrap()
            .unwrap();
        assert_eq!(hit.params, params(&[("path", "a/b/c.txt")]));

        assert!(m.match_path("/files/:path+", "/files").unwrap().is_none());
        assert!(m.match_path("/files/:path*", "/files").unwrap().is_some());
    }

    #[test]
    fn test_match_anonymous_splat() {
        let hit = default_matcher()
            .match_path("/static/*", "/static/css/site.css")
            .unwrap()
            .unwrap();
        assert_eq!(hit.params, params(&[("0", "css/site.css")]));
    }

    #[test]
    fn test_prefix_matching_respects_segment_boundary() {
        let m = PatternMatcher::new(MatchOptions::prefix());
        let hit = m.match_path("/api", "/api/status/x").unwrap().unwrap();
        assert_eq!(hit.path, "/api/");
        assert!(m.match_path("/api", "/apis").unwrap().is_none());
        assert!(m.match_path("/api", "/api").unwrap().is_some());
    }

    #[test]
    fn test_match_literal_metacharacters() {
        let m = default_matcher();
        assert!(m.match_path("/v1.0/(x)", "/v1.0/(x)").unwrap().is_some());
        assert!(m.match_path("/v1.0/(x)", "/v1x0/(x)").unwrap().is_none());
    }

    #[test]
    fn test_match_invalid_pattern() {
        assert!(matches!(
            default_matcher().match_path("/:", "/x"),
            Err(ShimError::InvalidPattern { .. })
        ));
    }

    #[test]
    fn test_compile_substitutes_and_encodes() {
        let m = default_matcher();
        let path = m
            .compile_path("/users/:id/tag/:tag", &params(&[("id", "42"), ("tag", "a b/c")]))
            .unwrap();
        assert_eq!(path, "/users/42/tag/a%20b%2Fc");
    }

    #[test]
    fn test_compile_optional_and_missing() {
        let m = default_matcher();
        assert_eq!(
            m.compile_path("/agents/:id?", &BTreeMap::new()).unwrap(),
            "/agents"
        );
        assert!(matches!(
            m.compile_path("/users/:id", &BTreeMap::new()),
            Err(ShimError::MissingParam(name)) if name == "id"
        ));
    }

    #[test]
    fn test_compile_repeated() {
        let m = default_matcher();
        assert_eq!(
            m.compile_path("/files/:path+", &params(&[("path", "a/b c")]))
                .unwrap(),
            "/files/a/b%20c"
        );
        assert_eq!(
            m.compile_path("/files/:path*", &params(&[("path", "")]))
                .unwrap(),
            "/files"
        );
        assert!(matches!(
            m.compile_path("/files/:path+", &params(&[("path", "")])),
            Err(ShimError::InvalidParam { .. })
        ));
    }

    #[test]
    fn test_compile_then_match_recovers_params() {
        let m = default_matcher();
        let pattern = "/api/agent/:id/runs/:run";
        let input = params(&[("id", "agent one"), ("run", "7")]);
        let path = m.compile_path(pattern, &input).unwrap();
        let hit = m.match_path(pattern, &path).unwrap().unwrap();
        assert_eq!(hit.params, input);
    }

    #[test]
    fn test_patterns_are_compiled_once() {
        let m = default_matcher();
        for path in ["/users/1", "/users/2", "/users/3"] {
            assert!(m.match_path("/users/:id", path).unwrap().is_some());
        }
        m.compile_path("/users/:id", &params(&[("id", "4")])).unwrap();
        assert_eq!(m.cache.lock().unwrap().len(), 1);

        let first = m.compiled("/users/:id").unwrap();
        let second = m.compiled("/users/:id").unwrap();
        assert!(Arc::ptr_eq(&first, &second));

        m.match_path("/teams/:team", "/teams/a").unwrap();
        assert_eq!(m.cache.lock().unwrap().len(), 2);

        // failed compiles are not cached
        assert!(m.match_path("/:", "/x").is_err());
        assert_eq!(m.cache.lock().unwrap().len(), 2);
    }

    #[test]
    fn test_compile_root() {
        assert_eq!(
            default_matcher().compile_path("/", &BTreeMap::new()).unwrap(),
            "/"
        );
    }
}
