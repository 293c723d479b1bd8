use chrono::NaiveDate;

use crate::models::fields;
use crate::models::EmploymentStatus;

/// Build the extraction prompt for one CV.
pub fn build_candidate_prompt(document_text: &str, serial_no: u32, today: NaiveDate) -> String {
    let field_list = fields::CANDIDATE_FIELDS.join(", ");
    let on_job = EmploymentStatus::OnJob.as_str();
    let jobless = EmploymentStatus::Jobless.as_str();
    let today = today.format("%Y-%m-%d");

    format!(
        r#"You are an expert in reading CVs. Extract the following fields from the CV text below:

{field_list}

Note:
- For {dob}, use the date format d-mmm-yy (e.g., 7-Mar-98).
- For {position}, return the position or job title held in the last/current company.
- For {degree_year}, return the year the degree was completed (e.g., "2019") or "Continue" if the degree is ongoing.
- For {status}, return "{on_job}" if the person is currently employed, otherwise "{jobless}".
- {mobiles} and {emails} can be multiple. Return them as lists of strings, e.g.:
  {mobiles}: ["+92 300-2485177", "+92 310-6510318"]
  {emails}: ["email1@example.com", "email2@example.com"]

{insert_date} = {today}
{serial} = {serial_no}

CV Text:
{document_text}

Respond only with a valid JSON object. Do not add any explanation or markdown. Strictly return the JSON object only.
"#,
        dob = fields::DOB,
        position = fields::LAST_COMPANY_POSITION,
        degree_year = fields::LAST_DEGREE_YEAR,
        status = fields::LAST_STATUS,
        mobiles = fields::MOBILE_NUMBERS,
        emails = fields::EMAILS,
        insert_date = fields::INSERT_DATE,
        serial = fields::SERIAL_NO,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn prompt() -> String {
        build_candidate_prompt(
            "Jane Smith\nLahore",
            12,
            NaiveDate::from_ymd_opt(2025, 2, 3).unwrap(),
        )
    }

    #[test]
    fn lists_every_field() {
        let p = prompt();
        for field in fields::CANDIDATE_FIELDS {
            assert!(p.contains(field), "prompt missing {field}");
        }
    }

    #[test]
    fn embeds_date_serial_and_text() {
        let p = prompt();
        assert!(p.contains("InsertDate = 2025-02-03"));
        assert!(p.contains("SerialNo = 12"));
        assert!(p.contains("CV Text:\nJane Smith\nLahore"));
    }

    #[test]
    fn states_status_vocabulary_and_output_rule() {
        let p = prompt();
        assert!(p.contains(r#"return "On Job" if"#));
        assert!(p.contains(r#"otherwise "Jobless""#));
        assert!(p.contains("\"Continue\""));
        assert!(p.contains("Respond only with a valid JSON object"));
    }
}
