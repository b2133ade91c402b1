use std::env;
use std::fs;
use std::path::Path;

use serde::Deserialize;

use crate::error::ConfigError;

/// Ranked 5v5 Solo Queue. Full list at
/// https://static.developer.riotgames.com/docs/lol/queues.json
pub const QUEUE_RANKED_SOLO: u32 = 420;
/// Normal Draft 5v5.
pub const QUEUE_NORMAL_DRAFT: u32 = 400;

pub const DEFAULT_REGION: &str = "euw1";
pub const DEFAULT_MAX_AGE_DAYS: i64 = 14;
pub const DEFAULT_SEARCH_DEPTH: usize = 3;
pub const DEFAULT_CONFIG_PATH: &str = "config.toml";

#[derive(Debug, Deserialize)]
struct ConfigFile {
    api_key: Option<String>,
}

/// Resolves the API credential: `RIOT_API_KEY` wins, otherwise `api_key` from the
/// TOML file at `path`.
pub fn load_api_key(path: &Path) -> Result<String, ConfigError> {
    if let Ok(key) = env::var("RIOT_API_KEY") {
        if !key.trim().is_empty() {
            return Ok(key.trim().to_string());
        }
    }

    api_key_from_file(path)
}

fn api_key_from_file(path: &Path) -> Result<String, ConfigError> {
    let display = path.display().to_string();
    if !path.exists() {
        return Err(ConfigError::MissingApiKey { path: display });
    }

    let contents = fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: display.clone(),
        source,
    })?;
    let parsed: ConfigFile = toml::from_str(&contents).map_err(|source| ConfigError::Parse {
        path: display.clone(),
        source,
    })?;

    parsed
        .api_key
        .map(|k| k.trim().to_string())
        .filter(|k| !k.is_empty())
        .ok_or(ConfigError::MissingApiKey { path: display })
}

/// Platform routing value (`euw1`) plus the regional cluster it belongs to (`europe`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Region {
    pub platform: String,
    pub regional: &'static str,
}

impl Region {
    pub fn parse(platform: &str) -> Result<Self, ConfigError> {
        let platform = platform.trim().to_lowercase();
        let regional = match platform.as_str() {
            "euw1" | "eun1" | "tr1" | "ru" | "me1" => "europe",
            "na1" | "br1" | "la1" | "la2" => "americas",
            "kr" | "jp1" => "asia",
            "oc1" | "ph2" | "sg2" | "th2" | "tw2" | "vn2" => "sea",
            _ => return Err(ConfigError::UnknownRegion(platform)),
        };

        Ok(Self { platform, regional })
    }

    pub fn regional_base_url(&self) -> String {
        format!("https://{}.api.riotgames.com", self.regional)
    }

    pub fn platform_base_url(&self) -> String {
        format!("https://{}.api.riotgames.com", self.platform)
    }
}

/// A `gameName#tagLine` pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RiotId {
    pub game_name: String,
    pub tag_line: String,
}

impl RiotId {
    pub fn parse(raw: &str) -> Result<Self, ConfigError> {
        match raw.trim().split_once('#') {
            Some((name, tag)) if !name.trim().is_empty() && !tag.trim().is_empty() => Ok(Self {
                game_name: name.trim().to_string(),
                tag_line: tag.trim().to_string(),
            }),
            _ => Err(ConfigError::InvalidRiotId(raw.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn region_routing() {
        let euw = Region::parse("EUW1").unwrap();
        assert_eq!(euw.platform, "euw1");
        assert_eq!(euw.regional_base_url(), "https://europe.api.riotgames.com");
        assert_eq!(euw.platform_base_url(), "https://euw1.api.riotgames.com");
        assert_eq!(Region::parse("kr").unwrap().regional, "asia");
        assert!(matches!(
            Region::parse("moon1"),
            Err(ConfigError::UnknownRegion(_))
        ));
    }

    #[test]
    fn riot_id_parsing() {
        let id = RiotId::parse("Orangen Sandwich#EUW").unwrap();
        assert_eq!(id.game_name, "Orangen Sandwich");
        assert_eq!(id.tag_line, "EUW");
        assert!(RiotId::parse("NoTag").is_err());
        assert!(RiotId::parse("#EUW").is_err());
    }

    #[test]
    fn api_key_from_toml_file() {
        let tmp = std::env::temp_dir().join("riot_match_stats_config_key");
        let _ = fs::create_dir_all(&tmp);
        let path = tmp.join("config.toml");
        fs::write(&path, "api_key = \"RGAPI-test\"\n").unwrap();
        assert_eq!(api_key_from_file(&path).unwrap(), "RGAPI-test");

        fs::write(&path, "other = 1\n").unwrap();
        assert!(matches!(
            api_key_from_file(&path),
            Err(ConfigError::MissingApiKey { .. })
        ));

        fs::write(&path, "api_key = [").unwrap();
        assert!(matches!(api_key_from_file(&path), Err(ConfigError::Parse { .. })));

        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn missing_config_file_reports_missing_key() {
        let path = std::env::temp_dir().join("riot_match_stats_absent/config.toml");
        assert!(matches!(
            api_key_from_file(&path),
            Err(ConfigError::MissingApiKey { .. })
        ));
    }
}
