use std::collections::{BTreeMap, BTreeSet};
use std::fs::File;
use std::io::Read;
use std::path::Path;

use anyhow::{Context, Result};
use tracing::{info, warn};

use crate::case::CaseRecord;

/// Reads one case per CSV row. The header row names the fields; unknown
/// columns are ignored and missing ones take their defaults.
pub fn read_cases(path: &Path) -> Result<Vec<CaseRecord>> {
    let file =
        File::open(path).with_context(|| format!("failed opening cases: {}", path.display()))?;
    let cases = parse_cases(file)
        .with_context(|| format!("failed parsing cases: {}", path.display()))?;
    info!("loaded {} cases from {}", cases.len(), path.display());
    Ok(cases)
}

pub fn parse_cases<R: Read>(reader: R) -> Result<Vec<CaseRecord>> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);
    let headers = csv_reader.headers()?.clone();

    let mut seen = BTreeSet::new();
    let mut cases = Vec::new();
    for (idx, row) in csv_reader.records().enumerate() {
        let row = row?;
        let line = idx + 2;
        let fields: BTreeMap<String, String> = headers
            .iter()
            .zip(row.iter())
            .map(|(h, v)| (h.to_string(), v.to_string()))
            .collect();
        let Some(case) = CaseRecord::from_fields(&fields) else {
            warn!("skipping row {line}: no id or title");
            continue;
        };
        if !seen.insert(case.id().to_string()) {
            warn!("skipping row {line}: duplicate case id {}", case.id());
            continue;
        }
        cases.push(case);
    }
    Ok(cases)
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use crate::case::ingest::{parse_cases, read_cases};

    const SAMPLE: &str = "\
id,title,roi_percent,payback_months,current_fte_count,target_fte_count
bc-1,Reconciliation bot,60,20,15,6
bc-2,Investor portal,abc,12,,
,,10,10,1,1
bc-1,Duplicate,1,1,1,1
";

    #[test]
    fn parses_rows_skipping_blank_and_duplicate_ids() {
        let cases = parse_cases(SAMPLE.as_bytes()).unwrap();
        assert_eq!(cases.len(), 2);
        assert_eq!(cases[0].id(), "bc-1");
        assert_eq!(cases[0].title, "Reconciliation bot");
        assert_eq!(cases[0].current.fte_count, 15.0);
        assert_eq!(cases[1].roi_percent, 0.0);
        assert_eq!(cases[1].payback_months, 12.0);
    }

    #[test]
    fn tolerates_short_rows() {
        let data = "id,title,roi\nbc-9,Short\n";
        let cases = parse_cases(data.as_bytes()).unwrap();
        assert_eq!(cases.len(), 1);
        assert_eq!(cases[0].roi_percent, 0.0);
    }

    #[test]
    fn reads_cases_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(SAMPLE.as_bytes()).unwrap();
        let cases = read_cases(file.path()).unwrap();
        assert_eq!(cases.len(), 2);
    }

    #[test]
    fn missing_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(read_cases(&dir.path().join("missing.csv")).is_err());
    }
}
