use std::{env, fs, path::Path, time::Duration};

use crate::{errors::Error, render::ResponseMode, Result};

/// Typed process configuration, loaded from the environment.
#[derive(Clone, Debug)]
pub struct Config {
    pub discord_bot_token: String,
    pub command_prefix: String,
    pub prune_interval: Duration,
    /// Ids allowed to change settings at runtime; empty disables the
    /// settings command entirely.
    pub admin_users: Vec<u64>,
    /// Initial values for the runtime-mutable settings.
    pub settings: SnipeSettings,
}

/// Runtime-mutable sniping settings.
///
/// The tracker holds these behind its lock; this struct is the snapshot
/// callers receive. All mutation goes through the tracker's validating
/// setters, so an invalid response mode can never land here.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SnipeSettings {
    pub max_age: Duration,
    pub response_mode: ResponseMode,
    pub allow_edit_sniping: bool,
    pub allow_deletion_sniping: bool,
    pub allow_self_snipe: bool,
}

impl Default for SnipeSettings {
    fn default() -> Self {
        Self {
            max_age: Duration::from_secs(60),
            response_mode: ResponseMode::Embed,
            allow_edit_sniping: true,
            allow_deletion_sniping: true,
            allow_self_snipe: false,
        }
    }
}

impl SnipeSettings {
    /// Sniping entirely off: neither edits nor deletions are tracked.
    pub fn sniping_disabled(&self) -> bool {
        !self.allow_edit_sniping && !self.allow_deletion_sniping
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        load_dotenv_if_present(Path::new(".env"));

        let discord_bot_token = env_str("DISCORD_BOT_TOKEN").unwrap_or_default();
        if discord_bot_token.trim().is_empty() {
            return Err(Error::Config(
                "DISCORD_BOT_TOKEN environment variable is required".to_string(),
            ));
        }

        let command_prefix = env_str("COMMAND_PREFIX")
            .and_then(non_empty)
            .unwrap_or_else(|| "!".to_string());

        let prune_interval = Duration::from_millis(env_u64("PRUNE_INTERVAL_MS").unwrap_or(3_000));

        let admin_users = parse_csv_u64(env_str("SNIPE_ADMIN_USERS"));

        // Parsed here so a bad mode fails startup instead of the first snipe.
        let response_mode = match env_str("SNIPE_RESPONSE_MODE") {
            Some(raw) => raw.parse()?,
            None => ResponseMode::Embed,
        };

        let settings = SnipeSettings {
            max_age: Duration::from_secs(env_u64("SNIPE_MAX_AGE_SECONDS").unwrap_or(60)),
            response_mode,
            allow_edit_sniping: env_bool("ALLOW_EDIT_SNIPING").unwrap_or(true),
            allow_deletion_sniping: env_bool("ALLOW_DELETION_SNIPING").unwrap_or(true),
            allow_self_snipe: env_bool("ALLOW_SELF_SNIPE").unwrap_or(false),
        };

        Ok(Self {
            discord_bot_token,
            command_prefix,
            prune_interval,
            admin_users,
            settings,
        })
    }
}

fn env_str(key: &str) -> Option<String> {
    env::var(key).ok()
}

fn load_dotenv_if_present(path: &Path) {
    let Ok(contents) = fs::read_to_string(path) else {
        return;
    };

    for raw in contents.lines() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let Some((k, v)) = line.split_once('=') else {
            continue;
        };

        let key = k.trim();
        if key.is_empty() {
            continue;
        }
        if env::var_os(key).is_some() {
            continue; // do not override existing env
        }

        let mut val = v.trim().to_string();
        // Strip optional surrounding quotes.
        if val.len() >= 2
            && ((val.starts_with('"') && val.ends_with('"'))
                || (val.starts_with('\'') && val.ends_with('\'')))
        {
            val = val[1..val.len() - 1].to_string();
        }

        env::set_var(key, val);
    }
}

fn env_bool(key: &str) -> Option<bool> {
    env_str(key).map(|s| {
        matches!(
            s.trim().to_lowercase().as_str(),
            "1" | "true" | "yes" | "on"
        )
    })
}

fn env_u64(key: &str) -> Option<u64> {
    env_str(key).and_then(|s| s.trim().parse::<u64>().ok())
}

fn parse_csv_u64(v: Option<String>) -> Vec<u64> {
    v.unwrap_or_default()
        .split(',')
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .filter_map(|s| s.parse::<u64>().ok())
        .collect()
}

fn non_empty(s: String) -> Option<String> {
    if s.trim().is_empty() {
        None
    } else {
        Some(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_allow_both_snipe_kinds() {
        let settings = SnipeSettings::default();
        assert!(!settings.sniping_disabled());
        assert!(!settings.allow_self_snipe);
        assert_eq!(settings.response_mode, ResponseMode::Embed);
    }

    #[test]
    fn disabled_only_when_both_flags_off() {
        let settings = SnipeSettings {
            allow_edit_sniping: false,
            ..SnipeSettings::default()
        };
        assert!(!settings.sniping_disabled());

        let settings = SnipeSettings {
            allow_edit_sniping: false,
            allow_deletion_sniping: false,
            ..SnipeSettings::default()
        };
        assert!(settings.sniping_disabled());
    }

    #[test]
    fn csv_user_ids_parse_leniently() {
        assert_eq!(
            parse_csv_u64(Some(" 1, 2,nope, 3 ,".to_string())),
            vec![1, 2, 3]
        );
        assert!(parse_csv_u64(None).is_empty());
    }
}
