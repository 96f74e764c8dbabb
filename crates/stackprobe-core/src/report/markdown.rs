use super::{Document, Section, SectionBody};

impl Document {
    /// Render as Markdown.
    #[must_use]
    pub fn to_markdown(&self) -> String {
        let mut lines = vec![
            format!("# {}", self.title),
            String::new(),
            format!("Generated: {}", self.generated_at),
        ];
        for section in &self.sections {
            lines.push(String::new());
            push_section(&mut lines, section, 2);
        }

        let mut out = lines.join("\n");
        out.push('\n');
        out
    }
}

fn push_section(lines: &mut Vec<String>, section: &Section, level: usize) {
    lines.push(format!("{} {}", "#".repeat(level), section.heading));
    lines.push(String::new());
    match &section.body {
        SectionBody::Lines { lines: body } => lines.extend(body.iter().cloned()),
        SectionBody::Bullets { items } => lines.extend(items.iter().map(|item| format!("- {item}"))),
        SectionBody::Table { headers, rows } => {
            lines.push(table_row(headers));
            lines.push(table_row(&vec!["---".to_string(); headers.len()]));
            lines.extend(rows.iter().map(|row| table_row(row)));
        }
        SectionBody::Nested { sections } => {
            for (i, child) in sections.iter().enumerate() {
                if i > 0 {
                    lines.push(String::new());
                }
                push_section(lines, child, level + 1);
            }
        }
    }
}

fn table_row(cells: &[String]) -> String {
    let cells: Vec<String> = cells.iter().map(|c| escape_cell(c)).collect();
    format!("| {} |", cells.join(" | "))
}

fn escape_cell(cell: &str) -> String {
    cell.replace('|', "\\|").replace('\n', " ")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(body: SectionBody) -> Document {
        Document {
            title: "Report".to_string(),
            generated_at: "now".to_string(),
            sections: vec![Section::new("Body", body)],
        }
    }

    #[test]
    fn renders_title_and_heading() {
        let md = doc(SectionBody::lines(["hello"])).to_markdown();
        assert_eq!(md, "# Report\n\nGenerated: now\n\n## Body\n\nhello\n");
    }

    #[test]
    fn table_cells_are_escaped() {
        let md = doc(SectionBody::Table {
            headers: vec!["A".to_string(), "B".to_string()],
            rows: vec![vec!["x|y".to_string(), "two\nlines".to_string()]],
        })
        .to_markdown();
        assert!(md.contains("| A | B |\n| --- | --- |\n| x\\|y | two lines |\n"));
    }

    #[test]
    fn nested_sections_go_one_level_deeper() {
        let md = doc(SectionBody::Nested {
            sections: vec![Section::new("Child", SectionBody::bullets(vec!["item".to_string()]))],
        })
        .to_markdown();
        assert!(md.contains("### Child\n\n- item\n"));
    }
}
