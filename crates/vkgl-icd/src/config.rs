use crate::state::DefaultState;

pub const LOG_GL_CALLS_ENV: &str = "VKGL_LOG_GL_CALLS";
pub const CHECK_GL_ERRORS_ENV: &str = "VKGL_CHECK_GL_ERRORS";
pub const FORCE_LEGACY_BACKEND_ENV: &str = "VKGL_FORCE_LEGACY_BACKEND";

#[derive(Debug, Clone, Default)]
pub struct IcdConfig {
    /// Trace every replayed command.
    pub log_gl_calls: bool,
    /// Poll `glGetError` after every replayed command.
    pub check_gl_errors: bool,
    /// Use the legacy backend even when the modern feature set is available.
    pub force_legacy_backend: bool,
    /// Initial snapshot of every context state stack.
    pub default_state: DefaultState,
}

impl IcdConfig {
    pub fn from_env() -> Self {
        let config = Self {
            log_gl_calls: env_var_truthy(LOG_GL_CALLS_ENV),
            check_gl_errors: env_var_truthy(CHECK_GL_ERRORS_ENV),
            force_legacy_backend: env_var_truthy(FORCE_LEGACY_BACKEND_ENV),
            default_state: DefaultState::default(),
        };
        tracing::debug!(
            log_gl_calls = config.log_gl_calls,
            check_gl_errors = config.check_gl_errors,
            force_legacy_backend = config.force_legacy_backend,
            "loaded driver configuration"
        );
        config
    }
}

fn env_var_truthy(name: &str) -> bool {
    let Ok(raw) = std::env::var(name) else {
        return false;
    };
    is_truthy(&raw)
}

fn is_truthy(raw: &str) -> bool {
    let v = raw.trim();
    v == "1"
        || v.eq_ignore_ascii_case("true")
        || v.eq_ignore_ascii_case("yes")
        || v.eq_ignore_ascii_case("on")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truthy_values() {
        for v in ["1", "true", "TRUE", " yes ", "On"] {
            assert!(is_truthy(v), "{v:?}");
        }
        for v in ["", "0", "false", "off", "2"] {
            assert!(!is_truthy(v), "{v:?}");
        }
    }
}
