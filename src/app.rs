use std::collections::HashSet;

use camino::Utf8Path;
use serde::Serialize;
use tracing::{error, info, warn};

use crate::domain::{AssemblyFormat, AssemblyName, RemoteLocation};
use crate::error::{Cancelled, KiraError};
use crate::interrupt::Interrupt;
use crate::manifest::{ChecksumManifest, MANIFEST_FILE_NAME, checksum_matches, md5_hex};
use crate::remote::RemoteClient;
use crate::store::{OutputDir, PathState, WriteFailure};

/// Terminal state of one (assembly, format) pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileOutcome {
    Existing,
    Fetched,
    NotFound,
    Failed(FailureKind),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    PathConflict,
    MissingChecksum,
    Download,
    ChecksumMismatch,
    Write,
    Rename,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct FetchCounters {
    pub fetched: usize,
    pub existing: usize,
    pub not_found: usize,
    pub failed: usize,
    pub skipped_assemblies: usize,
}

impl FetchCounters {
    pub fn record(&mut self, outcome: FileOutcome) {
        match outcome {
            FileOutcome::Existing => self.existing += 1,
            FileOutcome::Fetched => self.fetched += 1,
            FileOutcome::NotFound => self.not_found += 1,
            FileOutcome::Failed(_) => self.failed += 1,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FetchSummary {
    pub counters: FetchCounters,
    pub total: usize,
    pub left: usize,
}

impl FetchSummary {
    pub fn new(counters: FetchCounters, assemblies: usize, formats: usize) -> Self {
        let total = assemblies * formats;
        let left = total
            .saturating_sub(counters.existing)
            .saturating_sub(counters.not_found)
            .saturating_sub(counters.fetched);
        Self {
            counters,
            total,
            left,
        }
    }
}

/// Sequentially fetches the requested files of each assembly into the output
/// directory.
pub struct Fetcher<C: RemoteClient> {
    client: C,
    output: OutputDir,
    interrupt: Interrupt,
}

/// One requested file of an assembly.
struct FileTarget<'a> {
    assembly: &'a AssemblyName,
    file_name: String,
    remote: RemoteLocation,
}

impl<C: RemoteClient> Fetcher<C> {
    pub fn new(client: C, output: OutputDir, interrupt: Interrupt) -> Self {
        Self {
            client,
            output,
            interrupt,
        }
    }

    pub fn fetch_all(
        &self,
        urls: &[String],
        formats: &[AssemblyFormat],
    ) -> Result<FetchSummary, Cancelled> {
        let mut counters = FetchCounters::default();
        for url in urls {
            self.interrupt.check()?;
            self.fetch_assembly(url, formats, &mut counters)?;
        }
        Ok(FetchSummary::new(counters, urls.len(), formats.len()))
    }

    fn fetch_assembly(
        &self,
        url: &str,
        formats: &[AssemblyFormat],
        counters: &mut FetchCounters,
    ) -> Result<(), Cancelled> {
        let (location, assembly) = match parse_assembly_url(url) {
            Ok(parsed) => parsed,
            Err(err) => {
                error!("Cannot use assembly URL \"{url}\": {err}");
                warn!("Skipping assembly \"{url}\"...");
                counters.skipped_assemblies += 1;
                return Ok(());
            }
        };

        let all_present = formats.iter().all(|format| {
            OutputDir::probe(&self.output.output_path(&assembly, *format)) == PathState::File
        });
        if all_present {
            counters.existing += formats.len();
            info!("All files requested for {assembly} exist and are files, considered done");
            info!("Skipping {assembly}, already fetched");
            return Ok(());
        }
        info!("Fetching files for {assembly}...");

        let listing = match self.remote_call(|client| client.list(&location))? {
            Ok(names) => names.into_iter().collect::<HashSet<_>>(),
            Err(err) => {
                error!("Cannot fetch file list from \"{location}\": {err}");
                warn!("Skipping assembly {assembly}...");
                counters.skipped_assemblies += 1;
                return Ok(());
            }
        };
        info!("There are {} files at \"{location}\"", listing.len());

        let manifest_location = location.join(MANIFEST_FILE_NAME);
        let manifest = match self
            .remote_call(|client| client.fetch(&manifest_location, &self.interrupt))?
        {
            Ok(content) => ChecksumManifest::parse(&String::from_utf8_lossy(&content)),
            Err(err) => {
                error!(
                    "Info on MD5 checksums cannot be fetched from \"{manifest_location}\": {err}"
                );
                warn!("Skipping assembly {assembly}...");
                counters.skipped_assemblies += 1;
                return Ok(());
            }
        };
        info!("MD5 checksums for {assembly} successfully fetched");

        for format in formats {
            let file_name = format.file_name(&assembly);
            let target = FileTarget {
                assembly: &assembly,
                remote: location.join(&file_name),
                file_name,
            };
            let outcome = self.fetch_file(&target, &listing, &manifest)?;
            counters.record(outcome);
        }
        Ok(())
    }

    fn fetch_file(
        &self,
        target: &FileTarget<'_>,
        listing: &HashSet<String>,
        manifest: &ChecksumManifest,
    ) -> Result<FileOutcome, Cancelled> {
        let assembly = target.assembly;
        let remote = &target.remote;

        if !listing.contains(&target.file_name) {
            error!("No such file for {assembly}: \"{remote}\"");
            warn!("Skipping {assembly} assembly file: \"{remote}\"");
            return Ok(FileOutcome::NotFound);
        }

        let output_path = self.output.root().join(&target.file_name);
        match OutputDir::probe(&output_path) {
            PathState::File => {
                info!("The output path \"{output_path}\" exists and is a file, considered done");
                info!("Skipping {assembly} assembly file: \"{remote}\", already fetched");
                return Ok(FileOutcome::Existing);
            }
            PathState::Other => {
                error!("The output path \"{output_path}\" exists and is not a file");
                warn!("Skipping {assembly} assembly file: \"{remote}\"");
                return Ok(FileOutcome::Failed(FailureKind::PathConflict));
            }
            PathState::Missing => {}
        }

        let Some(expected) = manifest.get(&target.file_name) else {
            error!("Cannot find MD5 checksum for {assembly} assembly file: \"{remote}\"");
            warn!("Skipping {assembly} assembly file: \"{remote}\"");
            return Ok(FileOutcome::Failed(FailureKind::MissingChecksum));
        };

        let content = match self.remote_call(|client| client.fetch(remote, &self.interrupt))? {
            Ok(content) => content,
            Err(err) => {
                error!("{assembly} assembly file cannot be fetched from: \"{remote}\": {err}");
                warn!("Skipping {assembly} assembly file: \"{remote}\"");
                return Ok(FileOutcome::Failed(FailureKind::Download));
            }
        };
        info!("{assembly} assembly file \"{remote}\" successfully fetched");

        let actual = md5_hex(&content);
        if !checksum_matches(expected, &actual) {
            error!(
                "Incorrect MD5 checksum ({actual}) for {assembly} assembly file ({expected}): \"{remote}\""
            );
            warn!("Skipping {assembly} assembly file: \"{remote}\"");
            return Ok(FileOutcome::Failed(FailureKind::ChecksumMismatch));
        }
        info!("Correct MD5 checksum ({actual}) for {assembly} assembly file: \"{remote}\"");

        Ok(self.store(target, &output_path, &content))
    }

    fn store(
        &self,
        target: &FileTarget<'_>,
        output_path: &Utf8Path,
        content: &[u8],
    ) -> FileOutcome {
        let assembly = target.assembly;
        let remote = &target.remote;
        match self.output.write_atomic(output_path, content) {
            Ok(()) => {
                info!(
                    "{assembly} assembly file \"{remote}\" successfully saved to \"{output_path}\""
                );
                FileOutcome::Fetched
            }
            Err(failure) => {
                let (kind, reason) = match failure {
                    WriteFailure::Write(reason) => (FailureKind::Write, reason),
                    WriteFailure::Rename(reason) => (FailureKind::Rename, reason),
                };
                error!(
                    "Cannot save to \"{output_path}\" the {assembly} assembly file: \"{remote}\": {reason}"
                );
                warn!("Skipping {assembly} assembly file: \"{remote}\"");
                FileOutcome::Failed(kind)
            }
        }
    }

    /// Runs a network call, turning a pending interrupt into [`Cancelled`]
    /// whether it was raised before or during the call. Transfers watch the
    /// same flag and return early once it is raised.
    fn remote_call<T>(
        &self,
        call: impl FnOnce(&C) -> Result<T, KiraError>,
    ) -> Result<Result<T, KiraError>, Cancelled> {
        self.interrupt.check()?;
        let result = call(&self.client);
        self.interrupt.check()?;
        Ok(result)
    }
}

/// Parses an assembly directory URL, switching HTTPS links to FTP, and derives
/// the assembly name from it.
pub fn parse_assembly_url(url: &str) -> Result<(RemoteLocation, AssemblyName), KiraError> {
    let location = url.parse::<RemoteLocation>()?.normalized();
    let assembly = AssemblyName::from_location(&location)?;
    Ok((location, assembly))
}
