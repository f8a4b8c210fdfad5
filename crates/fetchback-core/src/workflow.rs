use crate::assembler::{Assessment, CheckedUrl, RetrievableFile};
use crate::comparator::ComparisonVerdict;
use crate::fs::FileSystem;
use crate::ledger::{DeletedFile, Ledger};
use crate::preserved::PreservedSet;
use crate::report;
use crate::size::format_size;
use crate::webloc;
use chrono::Local;
use std::collections::VecDeque;
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use tracing::{debug, error, info, warn};

/// `writeln!` to the console, logging instead of failing.
macro_rules! say {
    ($out:expr) => {
        if let Err(e) = writeln!($out) {
            warn!("Could not write to console: {}", e);
        }
    };
    ($out:expr, $($arg:tt)*) => {
        if let Err(e) = writeln!($out, $($arg)*) {
            warn!("Could not write to console: {}", e);
        }
    };
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunMode {
    /// Delete every retrievable file without asking.
    Unattended,
    Interactive,
}

/// Whether the process has more to do after a step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Exit,
}

/// Batch answer for the whole retrievable list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchChoice {
    Nothing,
    OneByOne,
    All,
}

/// What happens to a single file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    Delete,
    Keep,
    Preserve,
}

/// Source of operator answers.
pub trait Prompter {
    /// Show `prompt` and read one line. `None` on end of input.
    fn ask(&mut self, prompt: &str) -> Option<String>;
}

/// Reads answers from the terminal.
#[derive(Debug, Default)]
pub struct StdinPrompter;

impl Prompter for StdinPrompter {
    fn ask(&mut self, prompt: &str) -> Option<String> {
        print!("{}", prompt);
        if let Err(e) = io::stdout().flush() {
            debug!("Could not flush prompt: {}", e);
        }

        let mut line = String::new();
        match io::stdin().lock().read_line(&mut line) {
            Ok(0) => None,
            Ok(_) => Some(line),
            Err(e) => {
                warn!("Could not read answer: {}", e);
                None
            }
        }
    }
}

/// Replays a fixed list of answers, then reports end of input.
#[derive(Debug, Default)]
pub struct ScriptedPrompter {
    answers: VecDeque<String>,
    pub prompts: Vec<String>,
}

impl ScriptedPrompter {
    pub fn new<I, S>(answers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            answers: answers.into_iter().map(Into::into).collect(),
            prompts: Vec::new(),
        }
    }
}

impl Prompter for ScriptedPrompter {
    fn ask(&mut self, prompt: &str) -> Option<String> {
        self.prompts.push(prompt.to_string());
        self.answers.pop_front()
    }
}

/// A file that could not be removed.
#[derive(Debug, Clone)]
pub struct DeleteFailure {
    pub path: PathBuf,
    pub error: String,
}

#[derive(Debug, Default)]
pub struct RunOutcome {
    pub deleted: Vec<DeletedFile>,
    pub kept: Vec<PathBuf>,
    pub preserved: Vec<PathBuf>,
    pub failures: Vec<DeleteFailure>,
    /// Set when the ledger write failed. The deletions still stand.
    pub ledger_error: Option<String>,
    pub report_path: Option<PathBuf>,
}

impl RunOutcome {
    pub fn freed_bytes(&self) -> u64 {
        self.deleted.iter().map(|f| f.size).sum()
    }
}

/// Interpret the batch answer. Anything that is not an offered option deletes nothing.
pub fn parse_batch_choice(answer: Option<&str>, count: usize) -> BatchChoice {
    let Some(choice) = answer.and_then(|a| a.trim().parse::<usize>().ok()) else {
        return BatchChoice::Nothing;
    };
    match (choice, count) {
        (1, 1) => BatchChoice::All,
        (1, _) => BatchChoice::OneByOne,
        (n, count) if n == count && count > 1 => BatchChoice::All,
        _ => BatchChoice::Nothing,
    }
}

/// Interpret a per-file answer; the default is keep.
pub fn parse_disposition(answer: Option<&str>) -> Disposition {
    match answer.map(|a| a.trim().to_ascii_lowercase()).as_deref() {
        Some("d") | Some("delete") => Disposition::Delete,
        Some("p") | Some("preserve") => Disposition::Preserve,
        _ => Disposition::Keep,
    }
}

/// Takes an assessment through present, decide, act and done.
pub struct Workflow<'a> {
    fs: &'a dyn FileSystem,
    mode: RunMode,
    ledger: Option<Ledger<'a>>,
    preserved: Option<PreservedSet<'a>>,
    write_placeholders: bool,
    report_dir: Option<PathBuf>,
}

impl<'a> Workflow<'a> {
    pub fn new(fs: &'a dyn FileSystem, mode: RunMode) -> Self {
        Self {
            fs,
            mode,
            ledger: None,
            preserved: None,
            write_placeholders: false,
            report_dir: None,
        }
    }

    pub fn with_ledger(mut self, ledger: Ledger<'a>) -> Self {
        self.ledger = Some(ledger);
        self
    }

    pub fn with_preserved(mut self, preserved: PreservedSet<'a>) -> Self {
        self.preserved = Some(preserved);
        self
    }

    pub fn write_placeholders(mut self, enabled: bool) -> Self {
        self.write_placeholders = enabled;
        self
    }

    /// Write the Markdown report into `dir` after a non-empty batch.
    pub fn report_to(mut self, dir: PathBuf) -> Self {
        self.report_dir = Some(dir);
        self
    }

    /// Console write failures are logged and never stop the run; the ledger
    /// flush always happens once files have been removed.
    pub fn run(
        &self,
        assessment: Assessment,
        prompter: &mut dyn Prompter,
        out: &mut dyn Write,
    ) -> RunOutcome {
        let mut outcome = RunOutcome::default();
        info!(
            "{} retrievable file(s), {} in total; {} not retrievable",
            assessment.retrievable.len(),
            format_size(assessment.retrievable_size()),
            assessment.unretrievable.len()
        );
        let Assessment {
            retrievable,
            unretrievable,
        } = assessment;

        for file in &unretrievable {
            say!(
                out,
                "Not retrievable: {} ({} URL(s), none accessible)",
                file.candidate.name,
                file.urls.len()
            );
        }

        if self.present(&retrievable, out) == Flow::Exit {
            self.finish(&mut outcome, out);
            return outcome;
        }

        let dispositions = self.decide(&retrievable, prompter, out);
        for (mut file, disposition) in retrievable.into_iter().zip(dispositions) {
            match disposition {
                Disposition::Delete => self.delete(&mut file, &mut outcome, out),
                Disposition::Preserve => self.preserve(&file, &mut outcome, out),
                Disposition::Keep => outcome.kept.push(file.candidate.path.clone()),
            }
        }

        self.finish(&mut outcome, out);
        outcome
    }

    /// List the retrievable files. `Exit` when there is nothing to decide.
    pub fn present(&self, files: &[RetrievableFile], out: &mut dyn Write) -> Flow {
        if files.is_empty() {
            say!(out, "No retrievable files found.");
            return Flow::Exit;
        }

        let total: u64 = files.iter().map(|f| f.candidate.size).sum();
        say!(
            out,
            "\nFound {} retrievable file(s), {} in total:\n",
            files.len(),
            format_size(total)
        );
        for (index, file) in files.iter().enumerate() {
            say!(
                out,
                "{}. {} ({})",
                index + 1,
                file.candidate.name,
                format_size(file.candidate.size)
            );
            let hash = match file.candidate.known_hash() {
                Some("") => "unavailable".to_string(),
                Some(hash) => hash.to_string(),
                None => "not computed".to_string(),
            };
            say!(out, "   MD5: {}", hash);
            for url in &file.urls {
                say!(out, "   {}", describe_url(file, url));
            }
        }
        say!(out);
        Flow::Continue
    }

    /// One disposition per file, in order.
    pub fn decide(
        &self,
        files: &[RetrievableFile],
        prompter: &mut dyn Prompter,
        out: &mut dyn Write,
    ) -> Vec<Disposition> {
        if self.mode == RunMode::Unattended {
            return vec![Disposition::Delete; files.len()];
        }

        let count = files.len();
        let prompt = if count == 1 {
            "Delete this file? [0] No  [1] Yes: ".to_string()
        } else {
            format!(
                "[0] Delete nothing  [1] Decide one by one  [{}] Delete all: ",
                count
            )
        };
        let choice = parse_batch_choice(prompter.ask(&prompt).as_deref(), count);
        debug!("Batch choice {:?}", choice);

        match choice {
            BatchChoice::Nothing => {
                say!(out, "No files deleted.");
                vec![Disposition::Keep; count]
            }
            BatchChoice::All => vec![Disposition::Delete; count],
            BatchChoice::OneByOne => files
                .iter()
                .map(|file| {
                    let prompt = format!(
                        "{} ({}): [D]elete, [K]eep, [P]reserve (default K): ",
                        file.candidate.name,
                        format_size(file.candidate.size)
                    );
                    parse_disposition(prompter.ask(&prompt).as_deref())
                })
                .collect(),
        }
    }

    /// Hash before removing, then delete. A failure is recorded and the batch goes on.
    fn delete(&self, file: &mut RetrievableFile, outcome: &mut RunOutcome, out: &mut dyn Write) {
        let hash = file.candidate.content_hash(self.fs).to_string();
        let path = file.candidate.path.clone();

        if let Err(e) = self.fs.delete(&path) {
            error!("Error deleting {}: {}", path.display(), e);
            say!(out, "Failed to delete {}: {}", file.candidate.name, e);
            outcome.failures.push(DeleteFailure {
                path,
                error: e.to_string(),
            });
            return;
        }

        // The file is gone; record it before anything else can fail.
        outcome
            .deleted
            .push(DeletedFile::from_retrievable(file, hash, Local::now()));

        if self.write_placeholders {
            if let Some(url) = file.recovery_url() {
                match webloc::write_placeholder(self.fs, &path, url.url()) {
                    Ok(placeholder) => debug!("Wrote placeholder {}", placeholder.display()),
                    Err(e) => warn!("Could not write placeholder for {}: {}", path.display(), e),
                }
            }
        }
        say!(out, "Deleted {}", file.candidate.name);
    }

    fn preserve(&self, file: &RetrievableFile, outcome: &mut RunOutcome, out: &mut dyn Write) {
        let path = file.candidate.path.clone();
        let Some(preserved) = &self.preserved else {
            say!(out, "Cannot preserve {}: no store, keeping it", file.candidate.name);
            outcome.kept.push(path);
            return;
        };

        match preserved.add(&path) {
            Ok(_) => {
                say!(out, "Preserved {}", file.candidate.name);
                outcome.preserved.push(path);
            }
            Err(e) => {
                error!("Could not preserve {}: {}", path.display(), e);
                say!(out, "Could not preserve {}: {}. Keeping it.", file.candidate.name, e);
                outcome.kept.push(path);
            }
        }
    }

    /// Flush to the ledger, write the report, print the summary.
    fn finish(&self, outcome: &mut RunOutcome, out: &mut dyn Write) {
        if let Some(ledger) = &self.ledger {
            match ledger.record(&outcome.deleted) {
                Ok(ids) => debug!("Recorded ledger rows {:?}", ids),
                Err(e) => {
                    error!("Ledger write failed: {}", e);
                    say!(out, "Warning: deletions were not recorded in the ledger: {}", e);
                    outcome.ledger_error = Some(e.to_string());
                }
            }
        }

        if outcome.deleted.is_empty() {
            return;
        }

        if let Some(dir) = &self.report_dir {
            let now = Local::now();
            let path = report::report_path(dir, now);
            match self
                .fs
                .write_text(&path, &report::render_report(&outcome.deleted, now))
            {
                Ok(()) => {
                    say!(out, "Report written to {}", path.display());
                    outcome.report_path = Some(path);
                }
                Err(e) => {
                    warn!("Could not write report {}: {}", path.display(), e);
                    say!(out, "Could not write report: {}", e);
                }
            }
        }

        info!(
            "Deleted {} file(s), freed {}",
            outcome.deleted.len(),
            format_size(outcome.freed_bytes())
        );
        say!(
            out,
            "Deleted {} file(s), freed {}",
            outcome.deleted.len(),
            format_size(outcome.freed_bytes())
        );
        if !outcome.failures.is_empty() {
            say!(out, "{} file(s) could not be deleted", outcome.failures.len());
        }
    }
}

/// `[+] url (direct file) - matches local: ETag ...`
fn describe_url(file: &RetrievableFile, url: &CheckedUrl) -> String {
    let marker = if url.probe.accessible { "[+]" } else { "[-]" };
    let freshness = match &url.verdict {
        verdict if !verdict.changed() => "matches local",
        ComparisonVerdict::LastModifiedOnly { .. } => {
            match url.last_modified_hint(&file.candidate) {
                Some(true) => "likely matches local",
                _ => "may have changed",
            }
        }
        ComparisonVerdict::ProbeError { .. } => "unreachable",
        _ => "may have changed",
    };
    format!(
        "{} {} ({}) - {}: {}",
        marker,
        url.url(),
        report::type_label(url.probe.url_type),
        freshness,
        url.verdict.detail()
    )
}
