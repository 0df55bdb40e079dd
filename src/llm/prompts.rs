use crate::transform::Row;

const INDUSTRIES: [&str; 8] = [
    "healthcare & life sciences",
    "consumer & retail",
    "financial services",
    "enterprise tech",
    "insurance",
    "media & entertainment",
    "industrials",
    "health",
];

pub fn query_system(table_ddl: &str) -> String {
    let industries = INDUSTRIES
        .iter()
        .map(|i| format!("- {}", i))
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        r#"You are a SQL (postgres dialect) and data visualization expert. Your job is to help the user write a SQL query to retrieve the data they need. The table schema is as follows:

{ddl}

Only retrieval queries are allowed.

For things like industry, company names and other string fields, use the ILIKE operator and convert both the search term and the field to lowercase using LOWER() function. For example: LOWER(industry) ILIKE LOWER('%search_term%').

Note: select_investors is a comma-separated list of investors. Trim whitespace to ensure you're grouping properly. Some fields may be null or have only one value.
When answering questions about a specific field, ensure you are selecting the identifying column (ie. what is Vercel's valuation would select company and valuation).

The industries available are:
{industries}

If the user asks for a category that is not in the list, infer based on the list above.

Note: valuation is in billions of dollars so 10b would be 10.0.
Note: if the user asks for a rate, return it as a decimal. For example, 0.1 would be 10%.

If the user asks for 'over time' data, return by year.

When searching for UK or USA, write out United Kingdom or United States respectively.

EVERY QUERY SHOULD RETURN QUANTITATIVE DATA THAT CAN BE PLOTTED ON A CHART! There should always be at least two columns. If the user asks for a single column, return the column and the count of the column."#,
        ddl = table_ddl,
        industries = industries,
    )
}

pub fn query_prompt(question: &str) -> String {
    format!(
        "Generate the query necessary to retrieve the data the user wants: {}",
        question
    )
}

pub fn explain_system(table_ddl: &str) -> String {
    format!(
        r#"You are a SQL (postgres dialect) expert. Your job is to explain to the user the SQL query you wrote to retrieve the data they asked for. The table schema is as follows:

{}

When you explain you must take a section of the query, and then explain it. Each "section" should be unique and copied verbatim from the query. So in a query like: "SELECT * FROM unicorns limit 20", the sections could be "SELECT *", "FROM unicorns", "limit 20".
If a section doesn't have any explanation, include it, but leave the explanation empty."#,
        table_ddl
    )
}

pub fn explain_prompt(question: &str, sql: &str) -> String {
    format!(
        r#"Explain the SQL query you generated to retrieve the data the user wanted. Assume the user is not an expert in SQL. Break down the query into steps. Be concise.

User Query:
{}

Generated SQL Query:
{}"#,
        question, sql
    )
}

pub const CHART_SYSTEM: &str = "You are a SQL and data visualization expert.";

pub fn chart_prompt(question: &str, rows: &[Row]) -> String {
    let data = serde_json::to_string_pretty(rows).unwrap_or_else(|_| "[]".to_string());

    format!(
        r#"Given the following data from a SQL query result, generate the chart config that could visualise the data and answers the user's query without any data modification.
For multiple groups use multi-lines.

Here is an example complete config:
{{
  "type": "pie",
  "xKey": "month",
  "yKeys": ["sales", "profit", "expenses"],
  "legend": true
}}

User Query:
{}

Data:
{}"#,
        question, data
    )
}
