//! Terminal color policy shared by both binaries.
//!
//! Resolution order:
//! - `--color always|never` wins outright.
//! - Under `auto`, `NO_COLOR` or `EMACS` in the environment disables color.
//! - Otherwise color follows whether the stream is a TTY.

use std::env;

/// When to emit ANSI colors. Parsed directly from `--color`.
#[derive(clap::ValueEnum, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ColorWhen {
    /// Color only when the stream is a terminal.
    #[default]
    Auto,
    Always,
    Never,
}

impl ColorWhen {
    // ---
    /// Decides color for a stream given its TTY status and an env lookup.
    ///
    /// `env_set` answers whether a variable is present; it is injected so
    /// the policy can be checked without touching the process environment.
    pub fn resolve(self, is_tty: bool, env_set: impl Fn(&str) -> bool) -> bool {
        // ---
        match self {
            ColorWhen::Always => true,
            ColorWhen::Never => false,
            ColorWhen::Auto => !env_set("NO_COLOR") && !env_set("EMACS") && is_tty,
        }
    }

    /// Color decision for stderr, where tracing output goes.
    pub fn should_color_stderr(self) -> bool {
        // ---
        self.resolve(atty::is(atty::Stream::Stderr), |key| {
            env::var_os(key).is_some()
        })
    }
}

#[cfg(test)]
mod tests {
    // ---
    use super::*;

    fn env_with(vars: &'static [&'static str]) -> impl Fn(&str) -> bool {
        move |key: &str| vars.iter().any(|v| *v == key)
    }

    #[test]
    fn auto_follows_tty() {
        // ---
        assert!(ColorWhen::Auto.resolve(true, env_with(&[])));
        assert!(!ColorWhen::Auto.resolve(false, env_with(&[])));
    }

    #[test]
    fn no_color_disables_in_auto() {
        // ---
        assert!(!ColorWhen::Auto.resolve(true, env_with(&["NO_COLOR"])));
    }

    #[test]
    fn emacs_disables_in_auto() {
        // ---
        assert!(!ColorWhen::Auto.resolve(true, env_with(&["EMACS"])));
    }

    #[test]
    fn explicit_choice_ignores_env_and_tty() {
        // ---
        assert!(ColorWhen::Always.resolve(false, env_with(&["NO_COLOR"])));
        assert!(!ColorWhen::Never.resolve(true, env_with(&[])));
    }
}
