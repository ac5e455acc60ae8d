use std::path::PathBuf;

use clap::Parser;
use sim_fs::FsConfig;

#[derive(Parser)]
pub struct Cli {
    /// Script to run, one command per line; reads stdin if absent
    #[arg(long, short)]
    pub script: Option<PathBuf>,

    /// Number of blocks on the simulated device
    #[arg(long, default_value_t = FsConfig::default().total_blocks)]
    pub blocks: usize,

    /// Size of the inode table
    #[arg(long, default_value_t = FsConfig::default().inode_count)]
    pub inodes: usize,

    /// Buffer cache capacity in blocks
    #[arg(long, default_value_t = FsConfig::default().cache_capacity)]
    pub cache: usize,

    /// Journal ring capacity in records
    #[arg(long, default_value_t = FsConfig::default().journal_capacity)]
    pub journal: usize,
}

impl Cli {
    pub fn config(&self) -> FsConfig {
        FsConfig {
            total_blocks: self.blocks,
            inode_count: self.inodes,
            cache_capacity: self.cache,
            journal_capacity: self.journal,
            ..Default::default()
        }
    }
}
