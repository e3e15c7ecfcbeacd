/// Comparison input: a JSON array of records, or one record per line.
///
/// Line format: `contributor,item1,item2,criterion,score[,weight]`. An empty
/// score means the contributor skipped the criterion. Blank lines, `#`
/// comments, and a leading header line are ignored.
use licchavi_core::ComparisonRecord;

pub fn parse_records(content: &str) -> Result<Vec<ComparisonRecord>, String> {
    let trimmed = content.trim();
    if trimmed.starts_with('[') {
        return serde_json::from_str(trimmed)
            .map_err(|e| format!("Input looks like JSON but failed to parse: {e}"));
    }

    let mut records = Vec::new();
    for (n, line) in trimmed.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        if n == 0 && line.starts_with("contributor") {
            continue;
        }
        records.push(parse_line(line).map_err(|e| format!("Line {}: {e}", n + 1))?);
    }
    Ok(records)
}

fn parse_line(line: &str) -> Result<ComparisonRecord, String> {
    let fields: Vec<&str> = line.split(',').map(str::trim).collect();
    if fields.len() != 5 && fields.len() != 6 {
        return Err(format!("expected 5 or 6 fields, got {}", fields.len()));
    }

    let int = |name: &str, s: &str| {
        s.parse::<i64>().map_err(|_| format!("invalid {name} \"{s}\""))
    };
    let score = match fields[4] {
        "" => None,
        s => Some(s.parse::<f64>().map_err(|_| format!("invalid score \"{s}\""))?),
    };
    let weight = match fields.get(5) {
        None | Some(&"") => 1.0,
        Some(s) => s.parse::<f64>().map_err(|_| format!("invalid weight \"{s}\""))?,
    };
    if fields[3].is_empty() {
        return Err("empty criterion".to_string());
    }

    Ok(ComparisonRecord {
        contributor: int("contributor", fields[0])?,
        item1: int("item1", fields[1])?,
        item2: int("item2", fields[2])?,
        criterion: fields[3].to_string(),
        score,
        weight,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_lines() {
        let content = "\
contributor,item1,item2,criterion,score,weight
# first contributor
1,10,20,reliability,75,2

2,20,30,importance,,
3, 10 , 30 ,pedagogy,0
";
        let records = parse_records(content).unwrap();
        assert_eq!(records.len(), 3);
        assert_eq!(records[0].score, Some(75.0));
        assert_eq!(records[0].weight, 2.0);
        assert_eq!(records[1].score, None);
        assert_eq!(records[1].weight, 1.0);
        assert_eq!((records[2].item1, records[2].item2), (10, 30));
        assert_eq!(records[2].criterion, "pedagogy");
    }

    #[test]
    fn test_parse_json() {
        let content = r#"[
            {"contributor": 4, "item1": 1, "item2": 2, "criterion": "reliability", "score": 40.0},
            {"contributor": 4, "item1": 2, "item2": 3, "criterion": "reliability", "score": null, "weight": 0.5}
        ]"#;
        let records = parse_records(content).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].weight, 1.0);
        assert_eq!(records[1].score, None);
        assert_eq!(records[1].weight, 0.5);
    }

    #[test]
    fn test_parse_errors_name_the_line() {
        let err = parse_records("1,2,3,reliability,50\n1,2,x,reliability,50").unwrap_err();
        assert_eq!(err, "Line 2: invalid item2 \"x\"");
        assert!(parse_records("1,2,3").unwrap_err().contains("expected 5 or 6 fields"));
        assert!(parse_records("[{\"contributor\": 1}]").is_err());
    }
}
