//! Prompt templates for the reasoning flow

use crate::reasoning::criteria::CriteriaConfig;
use crate::reasoning::patient::UNKNOWN_PATIENT;

/// Templates for generating prompts at each stage
pub struct PromptTemplate;

impl PromptTemplate {
    /// System prompt for a criteria-driven assessment.
    ///
    /// Lists every criterion line verbatim, then either the threshold rule or
    /// an instruction to reason from general medical knowledge.
    pub fn criteria_system(criteria: &CriteriaConfig) -> String {
        let name = &criteria.name;
        let mut prompt = format!(
            "Answer the {name} assessment question based on the criteria provided below.\n\
You must conduct reasoning inside <think> and </think> first every time you get new information.\n\
After reasoning, if you find you lack some knowledge, you can call a search engine by <search> query </search>, and it will return the top searched results between <information> and </information>.\n\
You can search as many times as you want. If you find no further external knowledge needed, you can directly provide the answer inside <answer> and </answer> without detailed illustrations. Example: <answer> Assessment complete, patient shows signs of respiratory distress </answer>\n\n\
{name} criteria to consider:\n"
        );

        for line in &criteria.criteria_lines {
            prompt.push_str(line);
            prompt.push('\n');
        }

        if criteria.has_threshold() {
            prompt.push_str(&format!("\nThreshold rule: {}\n", criteria.threshold));
            prompt.push_str("Apply this threshold rule in your assessment.\n");
        } else {
            prompt.push_str(
                "\nUse your medical knowledge to reason about these specific criteria and determine their clinical significance.\n",
            );
        }

        prompt
    }

    /// Wrap follow-up input from the user on a continued session.
    pub fn continuation(user_input: &str) -> String {
        format!(
            "I'm providing additional information: {}. Please continue your assessment based on this new information.",
            user_input
        )
    }

    /// Attach a database excerpt to the content of a user turn.
    pub fn with_information(content: &str, excerpt: &str) -> String {
        format!(
            "{}\n\n<information>\n{}\n</information>",
            content, excerpt
        )
    }

    /// Natural-language-to-SQL prompt over the clinical schema.
    pub fn sql_generation(patient_id: &str, question: &str) -> String {
        let question = question.trim_matches('*').trim();
        let patient_line = if patient_id == UNKNOWN_PATIENT {
            String::new()
        } else {
            format!("The question concerns the patient with subject_id = {}.\n", patient_id)
        };

        format!(
            r#"Write only a valid SQL query (no explanation, no formatting, no comments) to answer the following and ensure that the code has a semicolon at the end question using a SQLite-compatible MIMIC-IV dataset.
Assume that the database contains the following tables: `admissions`, `diagnoses_icd`, `patients`, `prescriptions`, `procedures_icd`.
Use the correct table(s) based on the question.
Column names include:
- admissions(subject_id, hadm_id, admittime, dischtime, deathtime, admission_type, admit_provider_id, admission_location, discharge_location, insurance, language, marital_status, race, edregtime, edouttime, hospital_expire_flag)
- diagnoses_icd(subject_id, hadm_id, seq_num, icd_code, icd_version)
- patients(subject_id, gender, anchor_age, anchor_year, anchor_year_group, dod)
- prescriptions(subject_id, hadm_id, pharmacy_id, poe_id, poe_seq, order_provider_id, starttime, stoptime, drug_type, drug, formulary_drug_cd, gsn, ndc, prod_strength, form_rx, dose_val_rx, dose_unit_rx, form_val_disp, form_unit_disp, doses_per_24_hrs, route)
- procedures_icd(subject_id, hadm_id, seq_num, chartdate, icd_code, icd_version)
{patient_line}Question: {question}
Important:
- If the question involves prescriptions, select the `drug` column (which stores the medication names) along with if asked for it starttime and stoptime.
- Use standard SQL syntax supported by SQLite.
- Do NOT use T-SQL functions like DATEADD or NOW(). Instead, use strftime() or DATE().
- Ensure that date-related queries use the correct column names (`admittime`, `dischtime`, `deathtime`, `starttime`, `stoptime`, `chartdate`).
- If the question involves counts, use COUNT(*). If it requires an average, use AVG().
- If filtering by date, use DATE(column_name) or strftime('%Y-%m-%d', column_name).
- If multiple tables are required, use INNER JOINs on `subject_id` or `hadm_id` where appropriate.
- If a query requests data that may be missing, use COALESCE() to return 'N/A' instead of NULL.
- Do NOT generate multiple queries. Only return ONE valid SQL statement.
- Do NOT include ```sql or any formatting, only return the raw SQL statement.
- Ensure you have a semicolon at the end of the raw SQL statement.
Example:
SELECT COUNT(*) FROM admissions WHERE subject_id = 10009 AND DATE(admittime) >= DATE('now', '-1 month');
Now, generate the correct SQL query:"#
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reasoning::criteria::qsofa;

    #[test]
    fn test_criteria_system_lists_lines_and_threshold() {
        let prompt = PromptTemplate::criteria_system(&qsofa());
        assert!(prompt.starts_with("Answer the qSOFA assessment question"));
        assert!(prompt.contains("- Respiratory Rate (RR) ≥ 22 breaths/min\n"));
        assert!(prompt.contains("Threshold rule: ≥2 => qSOFA\n"));
        assert!(prompt.contains("Apply this threshold rule"));
        assert!(prompt.contains("<think>"));
        assert!(prompt.contains("as many times as you want"));
        assert!(!prompt.contains("Use your medical knowledge"));
    }

    #[test]
    fn test_criteria_system_without_threshold() {
        let criteria = CriteriaConfig::new("MEWS", "", vec!["- HR > 110".into()], "");
        let prompt = PromptTemplate::criteria_system(&criteria);
        assert!(prompt.contains("MEWS criteria to consider:\n- HR > 110\n"));
        assert!(prompt.contains("Use your medical knowledge"));
        assert!(!prompt.contains("Threshold rule"));
    }

    #[test]
    fn test_continuation_wrap() {
        assert_eq!(
            PromptTemplate::continuation("SBP is 90"),
            "I'm providing additional information: SBP is 90. Please continue your assessment based on this new information."
        );
    }

    #[test]
    fn test_with_information() {
        let content = PromptTemplate::with_information("patient 1 drugs?", "('Aspirin',)");
        assert!(content.starts_with("patient 1 drugs?\n\n<information>\n"));
        assert!(content.ends_with("</information>"));
    }

    #[test]
    fn test_sql_generation_prompt() {
        let prompt = PromptTemplate::sql_generation("10000032", "**which drugs?**");
        assert!(prompt.contains("subject_id = 10000032"));
        assert!(prompt.contains("Question: which drugs?\n"));
        assert!(prompt.ends_with("Now, generate the correct SQL query:"));

        let unknown = PromptTemplate::sql_generation(UNKNOWN_PATIENT, "count admissions");
        assert!(!unknown.contains("concerns the patient"));
    }
}
