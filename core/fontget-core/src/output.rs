//! JSON renderings of search results and catalog listings.
//!
//! Writers are generic over any serializable record, so the same helpers
//! emit [`SearchResult`](crate::rank::SearchResult) hits, full listings or
//! installed-font matches.

use std::io::{BufWriter, Write};

use anyhow::{Context, Result};
use serde::Serialize;

/// Write `items` as one indented JSON array followed by a newline.
pub fn write_json_pretty<T: Serialize>(items: &[T], w: impl Write) -> Result<()> {
    let mut w = BufWriter::new(w);
    serde_json::to_writer_pretty(&mut w, items).context("encoding results as JSON")?;
    w.write_all(b"\n")?;
    w.flush().context("flushing JSON output")
}

/// Write `items` as newline-delimited JSON, one record per line.
pub fn write_ndjson<T: Serialize>(items: &[T], w: impl Write) -> Result<()> {
    let mut w = BufWriter::new(w);
    for (line, item) in items.iter().enumerate() {
        serde_json::to_writer(&mut w, item)
            .with_context(|| format!("encoding record {line} as JSON"))?;
        w.write_all(b"\n")?;
    }
    w.flush().context("flushing NDJSON output")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rank::SearchResult;
    use crate::score::MatchType;

    fn sample_result(id: &str) -> SearchResult {
        SearchResult {
            name: "Roboto".to_string(),
            catalog_id: id.to_string(),
            source_key: "Google Fonts".to_string(),
            source_display_name: "Google Fonts".to_string(),
            license: "OFL".to_string(),
            categories: vec!["Sans Serif".to_string()],
            popularity: 80,
            score: 190,
            match_type: MatchType::ExactName,
        }
    }

    #[test]
    fn ndjson_writes_one_line_per_result() {
        let results = vec![sample_result("google.roboto"), sample_result("nerd.roboto")];
        let mut buf = Vec::new();

        write_ndjson(&results, &mut buf).expect("write ndjson");

        let text = String::from_utf8(buf).expect("utf8");
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 2);

        let parsed: serde_json::Value = serde_json::from_str(lines[1]).expect("parse");
        assert_eq!(parsed["id"], "nerd.roboto");
        assert_eq!(parsed["source_name"], "Google Fonts");
    }

    #[test]
    fn score_and_match_type_stay_internal() {
        let mut buf = Vec::new();
        write_json_pretty(&[sample_result("google.roboto")], &mut buf).expect("write json");

        let parsed: serde_json::Value = serde_json::from_slice(&buf).expect("parse");
        let first = &parsed[0];
        assert!(first.get("score").is_none());
        assert!(first.get("match_type").is_none());
        assert_eq!(first["popularity"], 80);
    }

    #[test]
    fn empty_input_is_an_empty_array() {
        let mut buf = Vec::new();
        write_json_pretty::<SearchResult>(&[], &mut buf).expect("write json");
        assert_eq!(String::from_utf8(buf).expect("utf8"), "[]\n");

        let mut buf = Vec::new();
        write_ndjson::<SearchResult>(&[], &mut buf).expect("write ndjson");
        assert!(buf.is_empty());
    }
}
