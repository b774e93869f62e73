//! Shared configuration and data model for the farmtools pipeline
//!
//! This crate centralizes everything the batch engine and the tool
//! plugins agree on: queue names, canonical merged-output file names,
//! artifact tags, shard-size defaults and the `none` sentinel used by
//! lenient task parameters. It also owns the shared data model
//! [tasks, artifacts, shards] and the error taxonomy every other
//! crate reports through.

pub mod fns;
pub mod mods;

pub use fns::*;
pub use mods::*;

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// shard planning
pub const DEFAULT_RECORDS_PER_SHARD: usize = 200;
pub const MIN_RECORDS_PER_SHARD: usize = 1;

// sentinel written for lenient task parameters that were never set
pub const SENTINEL: &str = "none";

// task parameter keys shared across job kinds
pub const SESSION_PARAM: &str = "session";
pub const DATABASE_PARAM: &str = "database";
pub const PROFILES_PARAM: &str = "profiles";
pub const GENUS_PARAM: &str = "genus";
pub const SPECIES_PARAM: &str = "species";

// configuration file naming: <kind><CONFIG_INFIX><index>
pub const CONFIG_INFIX: &str = "_config_";

// artifact record file name
pub const ARTIFACT_RECORD: &str = "artifact.json";

// canonical merged-output file names
pub const REPEATS: &str = "repeats.out";
pub const MASKED: &str = "masked.fa";
pub const HITS: &str = "hits.tsv";
pub const GENE_MODELS: &str = "genes.gff";
pub const TRNAS: &str = "trnas.out";
pub const ALIGNMENTS: &str = "alignments.gff";
pub const ALIGNMENT_LIST: &str = "alignments.list";
pub const DOMAINS: &str = "domains.tsv";

// artifact tags pre-registered by the tool plugins
pub const TAG_REPEATS: &str = "repeat annotation";
pub const TAG_MASKED: &str = "masked sequence";
pub const TAG_HITS: &str = "hits";
pub const TAG_GENES: &str = "gene models";
pub const TAG_TRNAS: &str = "trna predictions";
pub const TAG_ALIGNMENTS: &str = "alignments";
pub const TAG_ALIGNMENT_LIST: &str = "file list";
pub const TAG_DOMAINS: &str = "domain hits";
