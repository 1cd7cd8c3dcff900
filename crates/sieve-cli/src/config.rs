use std::fs::File;
use std::path::Path;

use policy_sieve::FilterConfig;
use serde::{Deserialize, Serialize};
use sieve_crawler::CrawlerConfig;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub crawler: CrawlerConfig,
    #[serde(default)]
    pub filter: FilterConfig,
    #[serde(default)]
    pub server: ServerConfig,
}

impl AppConfig {
    /// Reads a yaml configuration file, defaults apply to every missing field.
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        match path {
            Some(path) => {
                let file = File::open(path).map_err(|e| {
                    anyhow::anyhow!("Couldn't open config {}: {e}", path.display())
                })?;
                Ok(serde_yaml::from_reader(file)?)
            }
            None => Ok(Self::default()),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    /// Tried in order, the first one that can be bound is used
    #[serde(default = "default_ports")]
    pub ports: Vec<u16>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            ports: default_ports(),
        }
    }
}

fn default_host() -> String {
    String::from("0.0.0.0")
}

fn default_ports() -> Vec<u16> {
    vec![8080, 8081]
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use sieve_crawler::OnError;

    use super::*;

    #[test]
    fn missing_file_means_defaults() {
        let conf = AppConfig::load(None).unwrap();
        assert_eq!(vec![8080, 8081], conf.server.ports);
        assert_eq!(2, conf.crawler.max_depth);
        assert_eq!(20, conf.filter.min_fragment_len);
    }

    #[test]
    fn yaml_overrides_some_fields() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"
crawler:
  userAgent: TestBot
  concurrentDownloads: 2
  onDlError: Fail
filter:
  minFragmentLen: 40
  excludedPhrases: ["newsletter"]
server:
  ports: [9000]
"#
        )
        .unwrap();

        let conf = AppConfig::load(Some(file.path())).unwrap();
        assert_eq!("TestBot", conf.crawler.user_agent);
        assert_eq!(2, conf.crawler.concurrent_downloads);
        assert_eq!(OnError::Fail, conf.crawler.on_dl_error);
        assert_eq!(20, conf.crawler.fetch_timeout);
        assert_eq!(40, conf.filter.min_fragment_len);
        assert_eq!(vec!["newsletter".to_string()], conf.filter.excluded_phrases);
        assert!(conf.filter.policy_phrases.contains(&"privacy".to_string()));
        assert_eq!("0.0.0.0", conf.server.host);
        assert_eq!(vec![9000], conf.server.ports);
    }

    #[test]
    fn unreadable_file_is_an_error() {
        assert!(AppConfig::load(Some(Path::new("/nonexistent/sieve.yaml"))).is_err());
    }
}
