//! End-of-execution report.
//!
//! [`Reporter`] turns ranked sites into bounded [`SiteReport`] records. A
//! [`ReportSink`] decides how they are rendered.

use crate::config::ProfilerConfig;
use crate::error::ReportError;
use crate::field::FieldInterner;
use crate::host::LocationId;
use crate::monitor::CreationSite;
use crate::rank::RankedSite;
use crate::shape::{NodeId, TransitionTrie};
use crate::stats::ShapeTotals;
use indexmap::IndexMap;
use serde::Serialize;
use std::io::Write;

/// Complete report of one run
#[derive(Debug, Clone, Serialize)]
pub struct PolymorphismReport {
    /// Run-wide totals
    pub totals: ShapeTotals,
    /// Worst sites, highest rank first
    pub sites: Vec<SiteReport>,
}

/// One polymorphic access site
#[derive(Debug, Clone, Serialize)]
pub struct SiteReport {
    /// Call-site
    pub site: LocationId,
    /// Contention score
    pub rank: u64,
    /// Cache misses
    pub misses: u64,
    /// Cache hits
    pub hits: u64,
    /// Field of the last read at this site
    pub accessed_field: String,
    /// Reads per allocation site of the base object
    pub creation_sites: Vec<CreationAccess>,
    /// More creation sites exist than are listed
    pub creation_sites_truncated: bool,
    /// Observed layouts with per-field read counts
    pub layouts: Vec<LayoutReport>,
    /// More keys exist than are listed
    pub layouts_truncated: bool,
}

/// Reads of objects allocated at one site
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CreationAccess {
    /// Allocation site, `None` when unknown
    pub site: Option<LocationId>,
    /// Reads
    pub count: u64,
}

/// One hidden class seen at a site
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LayoutReport {
    /// Edge labels from the root, prototype first
    pub layout: Vec<String>,
    /// Reads per field under this layout
    pub fields: Vec<FieldReads>,
}

/// Read count of one field under one layout
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldReads {
    /// Field name
    pub field: String,
    /// Reads
    pub count: u64,
}

/// Consumer of a finished report.
pub trait ReportSink {
    /// Emit the report
    fn emit(&mut self, report: &PolymorphismReport) -> Result<(), ReportError>;
}

/// Builds bounded report records from ranked sites.
pub struct Reporter<'a> {
    config: &'a ProfilerConfig,
    trie: &'a TransitionTrie,
    fields: &'a FieldInterner,
}

impl<'a> Reporter<'a> {
    /// Create a reporter over the final engine state
    pub fn new(
        config: &'a ProfilerConfig,
        trie: &'a TransitionTrie,
        fields: &'a FieldInterner,
    ) -> Self {
        Self {
            config,
            trie,
            fields,
        }
    }

    /// Truncate to the worst sites, drop quiet ones, and describe the rest.
    pub fn build(&self, ranked: &[RankedSite<'_>], totals: ShapeTotals) -> PolymorphismReport {
        let sites = ranked
            .iter()
            .take(self.config.max_sites)
            .filter(|ranked| ranked.record.misses > self.config.min_misses)
            .map(|ranked| self.site_report(ranked))
            .collect();
        PolymorphismReport { totals, sites }
    }

    fn site_report(&self, ranked: &RankedSite<'_>) -> SiteReport {
        let record = ranked.record;
        let accessed_field = record
            .last_key
            .map(|key| self.fields.name(key.field).to_string())
            .unwrap_or_default();

        let creation_sites = record
            .creation_histogram()
            .take(self.config.max_creation_sites)
            .map(|(site, count)| CreationAccess {
                site: match site {
                    CreationSite::Known(loc) => Some(*loc),
                    CreationSite::Unknown => None,
                },
                count: *count,
            })
            .collect();

        // Keys that share a hidden class are merged under one layout.
        let mut layouts: IndexMap<NodeId, LayoutReport> = IndexMap::new();
        for (key, count) in record.key_histogram().take(self.config.max_layouts) {
            let Some(node) = self.trie.node_of(key.class) else {
                continue;
            };
            layouts
                .entry(node)
                .or_insert_with(|| LayoutReport {
                    layout: self
                        .trie
                        .layout(node)
                        .iter()
                        .map(|label| label.describe(self.fields))
                        .collect(),
                    fields: Vec::new(),
                })
                .fields
                .push(FieldReads {
                    field: self.fields.name(key.field).to_string(),
                    count: *count,
                });
        }

        SiteReport {
            site: ranked.site,
            rank: ranked.rank,
            misses: record.misses,
            hits: record.hits,
            accessed_field,
            creation_sites,
            creation_sites_truncated: record.distinct_creation_sites()
                > self.config.max_creation_sites,
            layouts: layouts.into_values().collect(),
            layouts_truncated: record.distinct_keys() > self.config.max_layouts,
        }
    }
}

/// Human-readable line output
pub struct TextSink<W: Write> {
    out: W,
}

impl<W: Write> TextSink<W> {
    /// Write lines to `out`
    pub fn new(out: W) -> Self {
        Self { out }
    }

    /// Recover the writer
    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> ReportSink for TextSink<W> {
    fn emit(&mut self, report: &PolymorphismReport) -> Result<(), ReportError> {
        let out = &mut self.out;
        writeln!(out, "---------------------------")?;
        writeln!(
            out,
            "Created {} hidden classes.",
            report.totals.hidden_classes_created
        )?;
        writeln!(
            out,
            "Processed {} property edges.",
            report.totals.edges_processed
        )?;

        for site in &report.sites {
            writeln!(out)?;
            writeln!(
                out,
                "property access at {} has missed cache {} time(s).",
                site.site, site.misses
            )?;
            for access in &site.creation_sites {
                let created_at = match access.site {
                    Some(loc) => loc.to_string(),
                    None => CreationSite::Unknown.to_string(),
                };
                writeln!(
                    out,
                    "  accessed property \"{}\" of object created at {} {} time(s)",
                    site.accessed_field, created_at, access.count
                )?;
            }
            if site.creation_sites_truncated {
                writeln!(out, "  ...")?;
            }
            for layout in &site.layouts {
                writeln!(out, "  layout [{}|]:", layout.layout.join("|"))?;
                for field in &layout.fields {
                    writeln!(
                        out,
                        "    read field: {} observed {} time(s)",
                        field.field, field.count
                    )?;
                }
            }
            if site.layouts_truncated {
                writeln!(out, "  ...")?;
            }
        }
        out.flush()?;
        Ok(())
    }
}

/// JSON output
pub struct JsonSink<W: Write> {
    out: W,
}

impl<W: Write> JsonSink<W> {
    /// Write JSON to `out`
    pub fn new(out: W) -> Self {
        Self { out }
    }

    /// Recover the writer
    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> ReportSink for JsonSink<W> {
    fn emit(&mut self, report: &PolymorphismReport) -> Result<(), ReportError> {
        serde_json::to_writer_pretty(&mut self.out, report)?;
        writeln!(self.out)?;
        self.out.flush()?;
        Ok(())
    }
}
