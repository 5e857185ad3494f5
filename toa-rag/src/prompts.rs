//! Prompt templates sent to the text generator.
//!
//! Placeholders are written `{name}` and filled with [`fill`].

/// Instruction for citation-grounded answers; the numbered sources travel as context.
pub const CITATION_QA: &str = "Answer the query using only the numbered sources supplied as \
context. After every statement, cite the source or sources it relies on by number in square \
brackets, for example [1] or [2, 3]. Cite a source only when you actually rely on it and never \
cite a number that is not listed. If none of the sources is relevant, say so plainly.\n\n\
Query: {query}\nAnswer:";

/// Response used when retrieval yields nothing; no citations accompany it.
pub const NO_SOURCES_RESPONSE: &str =
    "No relevant precedent was found: the indexed corpus returned no sources for this query.";

/// Suffix appended to precedent searches so the answer lists comparable cases.
pub const PRECEDENT_SUFFIX: &str = "\nList similar cases. If not exact, list similar cases.";

/// Petition used as the drafting model when the caller supplies none.
pub const EXAMPLE_PETITION: &str = include_str!("../assets/example_petition.txt");

/// Instruction for drafting a petition; the example petition travels as context.
pub const DRAFT_PETITION: &str = "Like the example petition provided as context, draft a sample \
petition for the following situation: {situation}. Rely on {jurisdiction} law.";

/// Instruction for statute explanations; the petition travels as context.
pub const EXPLAIN_STATUTES: &str = "Based on the petition provided as context, a possible \
approach was framed: {query}. Give a crisp, concise legal answer to the approach. Describe the \
relevant statutes in detail and how they can be used in this case.";

/// Instruction for the approach tree; the petition travels as context.
pub const DERIVE_APPROACHES: &str = "Considering the situation and the petition provided as \
context, map the tree of paths opposing counsel might take to defend against the petition. \
Produce between {min} and {max} approaches. Each approach is a node framed as a question or a \
complex legal situation and carries two research questions: one for a database of precedent \
cases and one for a database of statutes. Questions must be non-trivial, answerable by \
referencing multiple acts and precedents, and tailored to {jurisdiction} case law and acts. \
Approaches may overlap.\n\n\
Example approach:\n\
title: Was the decision to amalgamate made in accordance with the Companies Act, 2013?\n\
query_legal_database: Search for precedents where the Companies Act, 2013 was interpreted in \
relation to corporate restructuring, specifically amalgamation of subsidiaries.\n\
query_legal_acts: Cross-reference Sections 230 and 232 of the Companies Act, 2013 to check \
whether all procedural requirements for amalgamation were followed.\n\n\
Reply with JSON only, matching this shape:\n\
{\"approaches\": [{\"title\": \"...\", \"query_legal_database\": \"...\", \
\"query_legal_acts\": \"...\"}]}";

/// Replace every `{name}` placeholder with its value.
pub fn fill(template: &str, values: &[(&str, &str)]) -> String {
    values.iter().fold(template.to_string(), |acc, (name, value)| {
        acc.replace(&format!("{{{name}}}"), value)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fills_named_placeholders() {
        let prompt = fill(CITATION_QA, &[("query", "What is salvage?")]);
        assert!(prompt.ends_with("Query: What is salvage?\nAnswer:"));
    }

    #[test]
    fn leaves_json_braces_alone() {
        let prompt =
            fill(DERIVE_APPROACHES, &[("min", "5"), ("max", "100"), ("jurisdiction", "Indian")]);
        assert!(prompt.contains("between 5 and 100"));
        assert!(prompt.contains("{\"approaches\": [{\"title\""));
    }
}
