use serde::{Serialize, Deserialize};

use crate::error::Result;
use crate::network::spec::NetConfig;
use crate::train::train_config::TrainConfig;

/// Network and training settings for one run, as read by the `ddnet`
/// binary. Missing sections and fields take their defaults.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    pub net: NetConfig,
    pub train: TrainConfig,
}

impl RunConfig {
    pub fn validate(&self) -> Result<()> {
        self.net.validate()?;
        self.train.validate()
    }

    pub fn save_json(&self, path: &str) -> Result<()> {
        let file = std::fs::File::create(path)?;
        let writer = std::io::BufWriter::new(file);
        serde_json::to_writer_pretty(writer, self)?;
        Ok(())
    }

    pub fn load_json(path: &str) -> Result<RunConfig> {
        let file = std::fs::File::open(path)?;
        let reader = std::io::BufReader::new(file);
        Ok(serde_json::from_reader(reader)?)
    }
}
