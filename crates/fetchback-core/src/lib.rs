pub mod assembler;
pub mod comparator;
pub mod config;
pub mod error;
pub mod extractor;
pub mod fs;
pub mod hasher;
pub mod ledger;
pub mod platform;
pub mod preserved;
pub mod probe;
pub mod progress;
pub mod report;
pub mod scanner;
pub mod size;
pub mod storage;
pub mod webloc;
pub mod workflow;

pub use assembler::{Assembler, Assessment, CheckedUrl, RetrievableFile};
pub use comparator::{ComparisonVerdict, FreshnessComparator, UnsupportedComparator, ValidatorComparator};
pub use config::AppConfig;
pub use error::Error;
pub use extractor::{ProvenanceUrl, UrlExtractor, UrlOrigin};
pub use fs::{FileSystem, LocalFileSystem};
pub use probe::{HttpProbe, ProbeResult, UrlProbe, UrlType};
pub use progress::{ProgressReporter, SilentReporter};
pub use scanner::FileCandidate;
pub use workflow::{Flow, RunMode, RunOutcome, Workflow};
