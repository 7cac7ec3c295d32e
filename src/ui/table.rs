use crate::catalog::Company;
use crate::facet::FacetCount;
use tabled::{settings::Style, Table, Tabled};

#[derive(Tabled)]
pub struct TableRow {
    #[tabled(rename = "Metric")]
    pub metric: String,
    #[tabled(rename = "Value")]
    pub value: String,
}

pub struct TableBuilder {
    rows: Vec<TableRow>,
}

impl Default for TableBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl TableBuilder {
    pub fn new() -> Self {
        Self { rows: Vec::new() }
    }

    pub fn add_row(&mut self, label: &str, value: &str) {
        self.rows.push(TableRow {
            metric: label.to_string(),
            value: value.to_string(),
        });
    }

    pub fn build(&self) -> String {
        if self.rows.is_empty() {
            return String::new();
        }

        Table::new(&self.rows).with(Style::rounded()).to_string()
    }
}

pub fn stats_table(stats: &[(&str, &str)]) -> String {
    let mut builder = TableBuilder::new();
    for (label, value) in stats {
        builder.add_row(label, value);
    }
    builder.build()
}

#[derive(Tabled)]
struct CompanyRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Region")]
    region: String,
    #[tabled(rename = "Industry")]
    industry: String,
    #[tabled(rename = "Score")]
    score: String,
    #[tabled(rename = "Trusted")]
    trusted: String,
}

fn or_dash(value: Option<&str>) -> String {
    value.unwrap_or("-").to_string()
}

pub fn company_table(companies: &[Company]) -> String {
    if companies.is_empty() {
        return String::new();
    }
    let rows: Vec<CompanyRow> = companies
        .iter()
        .map(|c| CompanyRow {
            id: c.global_company_id.clone(),
            name: c.name.clone(),
            region: or_dash(c.region.as_deref()),
            industry: or_dash(c.industry.as_deref()),
            score: format!("{:.3}", c.final_score),
            trusted: if c.determinism_verified() { "yes" } else { "no" }.to_string(),
        })
        .collect();
    Table::new(rows).with(Style::rounded()).to_string()
}

#[derive(Tabled)]
struct FacetRow {
    #[tabled(rename = "Bucket")]
    bucket: String,
    #[tabled(rename = "Count")]
    count: u64,
}

pub fn facet_table(counts: &[FacetCount]) -> String {
    let rows: Vec<FacetRow> = counts
        .iter()
        .map(|c| FacetRow {
            bucket: c.bucket_value.clone(),
            count: c.count,
        })
        .collect();
    Table::new(rows).with(Style::psql()).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::fixtures;

    #[test]
    fn test_company_table_lists_rows() {
        let rendered = company_table(&[fixtures::company("c-1", "Acme", 0.91)]);
        assert!(rendered.contains("Acme"));
        assert!(rendered.contains("0.910"));
        assert!(rendered.contains("yes"));
    }

    #[test]
    fn test_empty_tables_render_nothing() {
        assert!(company_table(&[]).is_empty());
        assert!(TableBuilder::new().build().is_empty());
    }
}
