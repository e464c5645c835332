use anyhow::Result;
use tantivy::query::{BooleanQuery, FuzzyTermQuery, Occur, Query, TermQuery};
use tantivy::schema::{Field, IndexRecordOption};
use tantivy::{Index, Term};

use crate::tantivy_utils::KeywordFields;

/// Edit distance allowed for a query token: 0 up to 2 chars, 1 up to 5, 2 beyond.
pub fn fuzzy_distance(token: &str) -> u8 {
    match token.chars().count() {
        0..=2 => 0,
        3..=5 => 1,
        _ => 2,
    }
}

/// Run `text` through the analyzer registered for `field`, dropping duplicates.
pub fn analyze(index: &Index, field: Field, text: &str) -> Result<Vec<String>> {
    let mut analyzer = index.tokenizer_for_field(field)?;
    let mut stream = analyzer.token_stream(text);
    let mut tokens: Vec<String> = Vec::new();
    while stream.advance() {
        let token = &stream.token().text;
        if !tokens.iter().any(|t| t == token) {
            tokens.push(token.clone());
        }
    }
    Ok(tokens)
}

/// Exact-or-fuzzy match of every query token over the primary and abstract
/// fields. A document matching any token matches the query.
///
/// `None` when the query has no indexable tokens (empty or only stop words).
pub fn build_query(
    index: &Index,
    fields: &KeywordFields,
    text: &str,
) -> Result<Option<Box<dyn Query>>> {
    let tokens = analyze(index, fields.primary, text)?;
    if tokens.is_empty() {
        return Ok(None);
    }

    let token_queries: Vec<(Occur, Box<dyn Query>)> = tokens
        .iter()
        .map(|token| (Occur::Should, token_query(fields, token)))
        .collect();
    Ok(Some(Box::new(BooleanQuery::new(token_queries))))
}

fn token_query(fields: &KeywordFields, token: &str) -> Box<dyn Query> {
    let distance = fuzzy_distance(token);
    let mut clauses: Vec<(Occur, Box<dyn Query>)> = Vec::new();
    for field in [fields.primary, fields.secondary] {
        let term = Term::from_field_text(field, token);
        let exact = TermQuery::new(term.clone(), IndexRecordOption::WithFreqs);
        clauses.push((Occur::Should, Box::new(exact)));
        if distance > 0 {
            clauses.push((Occur::Should, Box::new(FuzzyTermQuery::new(term, distance, true))));
        }
    }
    Box::new(BooleanQuery::new(clauses))
}
