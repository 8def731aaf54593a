//! Prompt templates for the six roles
//!
//! Every template is deterministic in its inputs. Context sections are cut
//! to the configured caps so prompts stay bounded however large the
//! artifacts of earlier phases grow.

use crucible_core::PromptLimits;

/// Marker appended to a context section that was cut
const TRUNCATION_MARKER: &str = "...";

/// Cut `text` to at most `max_chars` characters, marking the cut
pub fn truncate_context(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((byte_idx, _)) => format!("{}{}", &text[..byte_idx], TRUNCATION_MARKER),
        None => text.to_string(),
    }
}

fn header(role_line: &str, iteration: usize) -> String {
    format!("{}\n\nITERATION: {}\n\n", role_line, iteration)
}

/// Architect: requirements -> architecture
pub fn architect_prompt(requirements: &str, iteration: usize, limits: &PromptLimits) -> String {
    let mut prompt = header(
        "You are an expert software architect specialised in system design.",
        iteration,
    );

    prompt.push_str("CLIENT REQUIREMENTS:\n");
    prompt.push_str(&truncate_context(requirements, limits.requirements_context));
    prompt.push_str("\n\n");

    prompt.push_str(
        "Produce a complete, detailed architecture covering:\n\
         1. **Component diagram** (ASCII or textual description)\n\
         2. **Design patterns** that fit (hexagonal, microservices, ...)\n\
         3. **Technical stack** (languages, frameworks, databases)\n\
         4. **Main modules** and their responsibilities\n\
         5. **Public interfaces** between modules\n\
         6. **Scalability strategy**\n\
         7. **Critical security points** to address\n\n\
         Format the answer as clear markdown sections.\n",
    );
    prompt
}

/// Developer: architecture + requirements -> code
pub fn developer_prompt(
    architecture: &str,
    requirements: &str,
    language: &str,
    iteration: usize,
    limits: &PromptLimits,
) -> String {
    let mut prompt = header(&format!("You are an expert {} developer.", language), iteration);

    prompt.push_str("ARCHITECTURE TO IMPLEMENT:\n");
    prompt.push_str(&truncate_context(architecture, limits.architecture_context));
    prompt.push_str("\n\nREQUIREMENTS:\n");
    prompt.push_str(&truncate_context(requirements, limits.requirements_context));
    prompt.push_str("\n\n");

    prompt.push_str(&format!(
        "Write production-quality code:\n\
         - Complete, working code (no pseudocode)\n\
         - Strict type annotations\n\
         - Documentation comments on public items\n\
         - Complete error handling\n\
         - Relevant logging\n\
         - No TODO markers (finished code)\n\
         - {} best practices\n\n\
         Structure the answer:\n\
         1. **Files to create** (list with paths)\n\
         2. **Complete code** (file by file)\n\
         3. **Dependencies**\n",
        language
    ));
    prompt
}

/// Reviewer: code + architecture -> scored review
pub fn reviewer_prompt(
    code: &str,
    architecture: &str,
    iteration: usize,
    limits: &PromptLimits,
) -> String {
    let mut prompt = header(
        "You are an expert in code review and software quality.",
        iteration,
    );

    prompt.push_str("CODE TO REVIEW:\n");
    prompt.push_str(&truncate_context(code, limits.code_context));
    prompt.push_str("\n\nTARGET ARCHITECTURE:\n");
    prompt.push_str(&truncate_context(architecture, limits.architecture_context));
    prompt.push_str("\n\n");

    prompt.push_str(
        "Perform a complete audit:\n\
         1. **Architecture conformance** (0-100)\n\
         2. **Code quality** (0-100): readability, maintainability, best practices\n\
         3. **Error handling** (0-100): completeness and relevance\n\
         4. **Type annotations** (0-100): coverage and strictness\n\
         5. **Documentation** (0-100): useful comments and docs\n\n\
         Compute a final AVERAGE score (0-100).\n\n\
         Format:\n\
         SCORE: [number]\n\
         ISSUES:\n\
         - [issue 1]\n\
         - [issue 2]\n\n\
         RECOMMENDATIONS:\n\
         - [recommendation 1]\n\
         - [recommendation 2]\n",
    );
    prompt
}

/// Security: code + requirements -> risk audit
pub fn security_prompt(
    code: &str,
    requirements: &str,
    iteration: usize,
    limits: &PromptLimits,
) -> String {
    let mut prompt = header(
        "You are an expert in software security and the OWASP Top 10.",
        iteration,
    );

    prompt.push_str("CODE TO AUDIT:\n");
    prompt.push_str(&truncate_context(code, limits.code_context));
    prompt.push_str("\n\nREQUIREMENTS:\n");
    prompt.push_str(&truncate_context(requirements, limits.requirements_context));
    prompt.push_str("\n\n");

    prompt.push_str(
        "Assess each risk from 0 (none) to 100 (critical):\n\
         1. **Injection** (SQL, command, ...)\n\
         2. **Weak authentication**\n\
         3. **Sensitive data exposure**\n\
         4. **XXE / XML processing**\n\
         5. **Broken access control**\n\
         6. **Security misconfiguration**\n\n\
         Report the highest risk as the overall risk score.\n\n\
         Format:\n\
         RISK SCORE: [number]\n\
         VULNERABILITIES:\n\
         - [vulnerability]\n\n\
         FIXES:\n\
         - [fix]\n",
    );
    prompt
}

/// Tester: code + requirements -> test suite
pub fn tester_prompt(
    code: &str,
    requirements: &str,
    iteration: usize,
    limits: &PromptLimits,
) -> String {
    let mut prompt = header(
        "You are an expert in software testing and TDD.",
        iteration,
    );

    prompt.push_str("CODE TO TEST:\n");
    prompt.push_str(&truncate_context(code, limits.code_context));
    prompt.push_str("\n\nREQUIREMENTS:\n");
    prompt.push_str(&truncate_context(requirements, limits.requirements_context));
    prompt.push_str("\n\n");

    prompt.push_str(
        "Write a complete test suite:\n\
         1. **Unit tests**: one per function or method\n\
         2. **Integration tests**: interaction between components\n\
         3. **Error tests**: edge cases and failures\n\
         4. **Coverage**: aim above 90%\n\n\
         Name tests test_<function>_<case>, include setup/teardown where\n\
         needed, and document each case. Output the complete test code.\n",
    );
    prompt
}

/// Documentation: architecture + code + requirements -> docs
pub fn documentation_prompt(
    architecture: &str,
    code: &str,
    requirements: &str,
    iteration: usize,
    limits: &PromptLimits,
) -> String {
    let mut prompt = header(
        "You are an expert technical writer for software projects.",
        iteration,
    );

    prompt.push_str("REQUIREMENTS:\n");
    prompt.push_str(&truncate_context(requirements, limits.requirements_context));
    prompt.push_str("\n\nARCHITECTURE:\n");
    prompt.push_str(&truncate_context(architecture, limits.architecture_context));
    prompt.push_str("\n\nCODE:\n");
    prompt.push_str(&truncate_context(code, limits.code_context));
    prompt.push_str("\n\n");

    prompt.push_str(
        "Write structured markdown documentation:\n\
         1. **README.md**: overview, installation, quick usage\n\
         2. **ARCHITECTURE.md**: architecture and design patterns\n\
         3. **API.md**: public interfaces\n\
         4. **SETUP.md**: developer setup\n\
         5. **TESTING.md**: running the tests\n\
         6. **DEPLOYMENT.md**: deployment guide\n\
         7. **TROUBLESHOOTING.md**: FAQ and common problems\n\n\
         Each section must be self-contained, with concrete examples.\n",
    );
    prompt
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small_limits() -> PromptLimits {
        PromptLimits {
            architecture_context: 10,
            code_context: 12,
            requirements_context: 8,
        }
    }

    #[test]
    fn test_truncate_context() {
        assert_eq!(truncate_context("short", 10), "short");
        assert_eq!(truncate_context("exactly10!", 10), "exactly10!");
        assert_eq!(truncate_context("abcdefghijkl", 5), "abcde...");
    }

    #[test]
    fn test_truncate_respects_char_boundaries() {
        assert_eq!(truncate_context("qualité élevée", 7), "qualité...");
    }

    #[test]
    fn test_prompts_are_deterministic() {
        let limits = PromptLimits::default();
        assert_eq!(
            reviewer_prompt("fn a() {}", "layers", 2, &limits),
            reviewer_prompt("fn a() {}", "layers", 2, &limits)
        );
    }

    #[test]
    fn test_sections_are_capped() {
        let code = "x".repeat(500);
        let prompt = security_prompt(&code, "must be safe and fast", 1, &small_limits());

        assert!(prompt.contains(&format!("{}...", "x".repeat(12))));
        assert!(!prompt.contains(&"x".repeat(13)));
        assert!(prompt.contains("must be ..."));
    }

    #[test]
    fn test_documentation_caps_each_section_separately() {
        let limits = PromptLimits {
            architecture_context: 5,
            code_context: 50,
            requirements_context: 100,
        };
        let code = "c".repeat(40);
        let prompt = documentation_prompt(&"a".repeat(20), &code, "reqs", 1, &limits);

        assert!(prompt.contains(&format!("CODE:\n{}\n", code)));
        assert!(prompt.contains("ARCHITECTURE:\naaaaa...\n"));

        let prompt = documentation_prompt("arch", &"c".repeat(60), "reqs", 1, &limits);
        assert!(prompt.contains(&format!("{}...", "c".repeat(50))));
        assert!(!prompt.contains(&"c".repeat(51)));
    }

    #[test]
    fn test_prompt_contents() {
        let limits = PromptLimits::default();

        let prompt = developer_prompt("hexagonal", "a todo api", "rust", 3, &limits);
        assert!(prompt.contains("expert rust developer"));
        assert!(prompt.contains("ITERATION: 3"));
        assert!(prompt.contains("hexagonal"));

        let prompt = reviewer_prompt("code", "arch", 1, &limits);
        assert!(prompt.contains("SCORE: [number]"));
        assert!(prompt.contains("RECOMMENDATIONS:"));

        let prompt = documentation_prompt("arch", "code", "reqs", 1, &limits);
        assert!(prompt.contains("README.md"));
        assert!(prompt.contains("reqs"));
    }
}
