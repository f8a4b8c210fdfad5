use crate::comparator::{self, ComparisonVerdict, FreshnessComparator};
use crate::extractor::{ProvenanceUrl, UrlExtractor};
use crate::fs::FileSystem;
use crate::probe::{ProbeResult, UrlProbe};
use crate::progress::ProgressReporter;
use crate::scanner::FileCandidate;
use rayon::prelude::*;
use std::time::Instant;
use tracing::{debug, info};

/// One provenance URL with its probe outcome and freshness verdict.
#[derive(Debug, Clone)]
pub struct CheckedUrl {
    pub source: ProvenanceUrl,
    pub probe: ProbeResult,
    pub verdict: ComparisonVerdict,
}

impl CheckedUrl {
    pub fn url(&self) -> &str {
        &self.source.url
    }

    /// Last-Modified vs. local mtime, only meaningful for `LastModifiedOnly`.
    pub fn last_modified_hint(&self, candidate: &FileCandidate) -> Option<bool> {
        match (&self.verdict, candidate.modified) {
            (ComparisonVerdict::LastModifiedOnly { last_modified }, Some(mtime)) => {
                comparator::last_modified_matches(last_modified, mtime)
            }
            _ => None,
        }
    }
}

/// A candidate with at least one accessible provenance URL.
#[derive(Debug, Clone)]
pub struct RetrievableFile {
    pub candidate: FileCandidate,
    pub urls: Vec<CheckedUrl>,
}

impl RetrievableFile {
    pub fn accessible_count(&self) -> usize {
        self.urls.iter().filter(|u| u.probe.accessible).count()
    }

    /// The first accessible URL in discovery order, else the first URL at all.
    pub fn recovery_url(&self) -> Option<&CheckedUrl> {
        self.urls
            .iter()
            .find(|u| u.probe.accessible)
            .or_else(|| self.urls.first())
    }
}

/// A candidate none of whose URLs answered. Reported, never deleted.
#[derive(Debug, Clone)]
pub struct UnretrievableFile {
    pub candidate: FileCandidate,
    pub urls: Vec<(ProvenanceUrl, ProbeResult)>,
}

#[derive(Debug, Default)]
pub struct Assessment {
    pub retrievable: Vec<RetrievableFile>,
    pub unretrievable: Vec<UnretrievableFile>,
}

impl Assessment {
    pub fn retrievable_size(&self) -> u64 {
        self.retrievable.iter().map(|f| f.candidate.size).sum()
    }
}

/// Extract, probe and compare, one file at a time.
pub struct Assembler<'a> {
    fs: &'a dyn FileSystem,
    extractor: UrlExtractor<'a>,
    probe: &'a dyn UrlProbe,
    comparator: &'a dyn FreshnessComparator,
}

impl<'a> Assembler<'a> {
    pub fn new(
        fs: &'a dyn FileSystem,
        extractor: UrlExtractor<'a>,
        probe: &'a dyn UrlProbe,
        comparator: &'a dyn FreshnessComparator,
    ) -> Self {
        Self {
            fs,
            extractor,
            probe,
            comparator,
        }
    }

    pub fn assess(
        &self,
        candidates: Vec<FileCandidate>,
        reporter: &dyn ProgressReporter,
    ) -> Assessment {
        let total = candidates.len();
        let started = Instant::now();
        reporter.on_check_start(total);

        let mut assessment = Assessment::default();
        for (index, candidate) in candidates.into_iter().enumerate() {
            reporter.on_check_file(index + 1, total, &candidate.name);
            match self.check(candidate) {
                Ok(file) => {
                    reporter.on_check_result(&file.candidate.name, file.accessible_count(), file.urls.len());
                    assessment.retrievable.push(file);
                }
                Err(file) => {
                    reporter.on_check_result(&file.candidate.name, 0, file.urls.len());
                    assessment.unretrievable.push(file);
                }
            }
        }

        let retrievable = assessment.retrievable.len();
        reporter.on_check_complete(retrievable, started.elapsed().as_secs_f64());
        info!("{} of {} candidate(s) retrievable", retrievable, total);
        assessment
    }

    /// Probe every URL of one file. The content hash is only computed for
    /// files that turn out to be retrievable.
    pub fn check(
        &self,
        mut candidate: FileCandidate,
    ) -> Result<RetrievableFile, UnretrievableFile> {
        let sources = self.extractor.extract(&candidate.path);

        // URLs of the same file are independent reads; the order is kept.
        let probe = self.probe;
        let results: Vec<ProbeResult> = sources
            .par_iter()
            .map(|source| probe.probe(&source.url))
            .collect();

        if !results.iter().any(|r| r.accessible) {
            debug!("No accessible URL for {}", candidate.name);
            return Err(UnretrievableFile {
                candidate,
                urls: sources.into_iter().zip(results).collect(),
            });
        }

        let local_hash = candidate.content_hash(self.fs).to_string();
        let urls = sources
            .into_iter()
            .zip(results)
            .map(|(source, probe)| {
                let verdict = self.comparator.compare(&probe, &local_hash);
                CheckedUrl {
                    source,
                    probe,
                    verdict,
                }
            })
            .collect();

        Ok(RetrievableFile { candidate, urls })
    }
}
