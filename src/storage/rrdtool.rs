//! Store backed by the `rrdtool` command-line tool
//!
//! `info` runs `rrdtool info <file>` and collects the `ds[<name>]` keys.
//! `export` runs `rrdtool xport` with one `DEF`/`CDEF` argument per binding
//! and one `XPORT` argument per visible output, then decodes the XML
//! document it prints:
//!
//! ```text
//! <xport>
//!   <meta>
//!     <start>946771200</start> <step>60</step> <end>946771500</end>
//!     <rows>5</rows> <columns>1</columns>
//!     <legend><entry>A</entry></legend>
//!   </meta>
//!   <data>
//!     <row><t>946771260</t><v>1.0000000000e+02</v></row>
//!   </data>
//! </xport>
//! ```

use async_trait::async_trait;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tokio::process::Command;

use crate::storage::error::{StorageError, StorageResult};
use crate::storage::types::{ExportDef, ExportRequest, ExportResult};
use crate::storage::Store;

/// Store that shells out to `rrdtool`
#[derive(Debug, Clone)]
pub struct RrdtoolStore {
    binary: PathBuf,
}

impl RrdtoolStore {
    /// Create a store using the given `rrdtool` executable
    pub fn new(binary: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
        }
    }

    /// Path of the executable
    pub fn binary(&self) -> &Path {
        &self.binary
    }

    async fn run(&self, args: &[String]) -> StorageResult<String> {
        tracing::debug!(binary = ?self.binary, ?args, "Running rrdtool");

        let output = Command::new(&self.binary).args(args).output().await?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(StorageError::Command(stderr.trim().to_string()));
        }

        String::from_utf8(output.stdout)
            .map_err(|e| StorageError::Malformed(format!("non UTF-8 output: {}", e)))
    }
}

impl Default for RrdtoolStore {
    fn default() -> Self {
        Self::new("rrdtool")
    }
}

#[async_trait]
impl Store for RrdtoolStore {
    fn name(&self) -> &str {
        "rrdtool"
    }

    async fn info(&self, file: &Path) -> StorageResult<Vec<String>> {
        let args = vec!["info".to_string(), file.to_string_lossy().into_owned()];
        let text = self.run(&args).await?;
        let names = parse_info(&text);

        if names.is_empty() {
            return Err(StorageError::Malformed(format!(
                "no datasources in info output for {:?}",
                file
            )));
        }

        Ok(names)
    }

    async fn export(&self, request: &ExportRequest) -> StorageResult<ExportResult> {
        let args = xport_args(request);
        let xml = self.run(&args).await?;
        parse_xport(&xml)
    }
}

/// Extract datasource names from `rrdtool info` output, in order of appearance
pub(crate) fn parse_info(text: &str) -> Vec<String> {
    let mut names: Vec<String> = Vec::new();

    for line in text.lines() {
        let Some(rest) = line.trim_start().strip_prefix("ds[") else {
            continue;
        };
        let Some(end) = rest.find(']') else {
            continue;
        };
        let name = &rest[..end];
        if !name.is_empty() && !names.iter().any(|n| n == name) {
            names.push(name.to_string());
        }
    }

    names
}

/// Build the `rrdtool xport` argument list for a request
pub(crate) fn xport_args(request: &ExportRequest) -> Vec<String> {
    let step = request.step.max(1);
    let rows = ((request.end - request.start) / step + 1).max(1);

    let mut args = vec![
        "xport".to_string(),
        "--start".to_string(),
        request.start.to_string(),
        "--end".to_string(),
        request.end.to_string(),
        "--step".to_string(),
        step.to_string(),
        "--maxrows".to_string(),
        rows.to_string(),
    ];

    for def in &request.defs {
        args.push(match def {
            ExportDef::Raw {
                name,
                file,
                datasource,
                consolidation,
                options,
            } => {
                let mut spec = format!(
                    "DEF:{}={}:{}:{}",
                    name,
                    escape_path(file),
                    datasource,
                    consolidation
                );
                for option in options {
                    spec.push(':');
                    spec.push_str(option);
                }
                spec
            }
            ExportDef::Derived { name, expression } => format!("CDEF:{}={}", name, expression),
        });
    }

    for output in &request.outputs {
        args.push(format!("XPORT:{}:{}", output, output));
    }

    args
}

/// rrdtool treats `:` as a field separator inside DEF arguments
fn escape_path(file: &Path) -> String {
    file.to_string_lossy().replace(':', "\\:")
}

#[derive(Debug, Deserialize)]
struct XportDocument {
    meta: XportMeta,
    #[serde(default)]
    data: XportData,
}

#[derive(Debug, Deserialize)]
struct XportMeta {
    start: i64,
    step: i64,
    #[serde(default)]
    legend: XportLegend,
}

#[derive(Debug, Default, Deserialize)]
struct XportLegend {
    #[serde(default)]
    entry: Vec<String>,
}

#[derive(Debug, Default, Deserialize)]
struct XportData {
    #[serde(default)]
    row: Vec<XportRow>,
}

#[derive(Debug, Deserialize)]
struct XportRow {
    #[serde(default)]
    v: Vec<String>,
}

/// Decode the XML document printed by `rrdtool xport`
pub(crate) fn parse_xport(xml: &str) -> StorageResult<ExportResult> {
    let doc: XportDocument = quick_xml::de::from_str(xml)?;

    if doc.meta.step <= 0 {
        return Err(StorageError::Malformed(format!(
            "non-positive step {} in xport output",
            doc.meta.step
        )));
    }

    let legends: Vec<String> = doc
        .meta
        .legend
        .entry
        .into_iter()
        .map(|e| e.trim().to_string())
        .collect();

    let mut result = ExportResult::new(legends, doc.meta.start, doc.meta.step);

    for row in doc.data.row {
        let values = row
            .v
            .iter()
            .map(|v| parse_value(v))
            .collect::<StorageResult<Vec<f64>>>()?;
        result.push_row(values);
    }

    Ok(result)
}

/// rrdtool prints unknown samples as `NaN`, `nan` or `-nan` depending on libc
fn parse_value(text: &str) -> StorageResult<f64> {
    let text = text.trim();
    match text.to_ascii_lowercase().as_str() {
        "nan" | "-nan" | "+nan" | "u" => Ok(f64::NAN),
        _ => text
            .parse::<f64>()
            .map_err(|_| StorageError::Malformed(format!("invalid sample value '{}'", text))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::types::Consolidation;

    const INFO: &str = r#"filename = "/data/server1.net/interface-eth0/if_octets.rrd"
rrd_version = "0003"
step = 60
last_update = 946771500
header_size = 1624
ds[rx].index = 0
ds[rx].type = "DERIVE"
ds[rx].minimal_heartbeat = 120
ds[tx].index = 1
ds[tx].type = "DERIVE"
ds[tx].minimal_heartbeat = 120
rra[0].cf = "AVERAGE"
"#;

    const XPORT: &str = r#"<?xml version="1.0" encoding="ISO-8859-1"?>
<xport>
  <meta>
    <start>946771200</start>
    <step>60</step>
    <end>946771500</end>
    <rows>3</rows>
    <columns>2</columns>
    <legend>
      <entry>RX</entry>
      <entry>SUM</entry>
    </legend>
  </meta>
  <data>
    <row><t>946771260</t><v>1.0000000000e+02</v><v>4.2000000000e+02</v></row>
    <row><t>946771320</t><v>NaN</v><v>-nan</v></row>
    <row><t>946771380</t><v>1.2000000000e+02</v><v>4.6000000000e+02</v></row>
  </data>
</xport>
"#;

    #[test]
    fn test_parse_info_datasources() {
        assert_eq!(parse_info(INFO), vec!["rx".to_string(), "tx".to_string()]);
        assert!(parse_info("filename = \"x.rrd\"\n").is_empty());
    }

    #[test]
    fn test_parse_xport() {
        let result = parse_xport(XPORT).unwrap();

        assert_eq!(result.legends, vec!["RX".to_string(), "SUM".to_string()]);
        assert_eq!(result.start, 946771200);
        assert_eq!(result.step, 60);
        assert_eq!(result.rows, 3);
        assert_eq!(result.value_at(0, 0), 100.0);
        assert_eq!(result.value_at(1, 0), 420.0);
        assert!(result.value_at(0, 1).is_nan());
        assert!(result.value_at(1, 1).is_nan());
        assert_eq!(result.value_at(1, 2), 460.0);
    }

    #[test]
    fn test_parse_xport_empty_data() {
        let xml = r#"<xport><meta><start>0</start><step>300</step><end>0</end>
            <rows>0</rows><columns>0</columns><legend></legend></meta><data></data></xport>"#;
        let result = parse_xport(xml).unwrap();
        assert_eq!(result.rows, 0);
        assert!(result.legends.is_empty());
    }

    #[test]
    fn test_parse_xport_rejects_garbage_value() {
        let xml = r#"<xport><meta><start>0</start><step>60</step>
            <legend><entry>A</entry></legend></meta>
            <data><row><t>60</t><v>abc</v></row></data></xport>"#;
        assert!(matches!(parse_xport(xml), Err(StorageError::Malformed(_))));
    }

    #[test]
    fn test_xport_args() {
        let request = ExportRequest {
            defs: vec![
                ExportDef::Raw {
                    name: "RX".into(),
                    file: PathBuf::from("/data/eth0/if_octets.rrd"),
                    datasource: "rx".into(),
                    consolidation: Consolidation::Max,
                    options: vec!["step=300".into()],
                },
                ExportDef::Derived {
                    name: "BITS".into(),
                    expression: "RX,8,*".into(),
                },
            ],
            outputs: vec!["BITS".into()],
            start: 1000,
            end: 1600,
            step: 60,
        };

        let args = xport_args(&request);
        assert_eq!(
            args,
            vec![
                "xport",
                "--start",
                "1000",
                "--end",
                "1600",
                "--step",
                "60",
                "--maxrows",
                "11",
                "DEF:RX=/data/eth0/if_octets.rrd:rx:MAX:step=300",
                "CDEF:BITS=RX,8,*",
                "XPORT:BITS:BITS",
            ]
        );
    }

    #[test]
    fn test_escape_path() {
        assert_eq!(escape_path(Path::new("/data/a:b.rrd")), "/data/a\\:b.rrd");
    }
}
