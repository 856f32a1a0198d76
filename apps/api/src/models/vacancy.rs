use serde::{Deserialize, Serialize};

/// Structured-extraction output for one vacancy, as the model returns it.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VacancyResponse {
    #[serde(default)]
    pub job_title: String,
    #[serde(default)]
    pub job_description: String,
    #[serde(default)]
    pub candidate_requirements: String,
    #[serde(default)]
    pub working_conditions: String,
    #[serde(default)]
    pub location: String,
    #[serde(default)]
    pub contact_info: String,
}

/// A vacancy tied back to the page it was extracted from.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Vacancy {
    pub job_title: String,
    pub job_description: String,
    pub candidate_requirements: String,
    pub working_conditions: String,
    pub location: String,
    pub contact_info: String,
    pub url: String,
}

impl Vacancy {
    pub fn from_response(response: VacancyResponse, url: impl Into<String>) -> Self {
        Self {
            job_title: response.job_title,
            job_description: response.job_description,
            candidate_requirements: response.candidate_requirements,
            working_conditions: response.working_conditions,
            location: response.location,
            contact_info: response.contact_info,
            url: url.into(),
        }
    }
}

impl std::fmt::Display for Vacancy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Должность: {}", self.job_title)?;
        writeln!(f, "Описание: {}", self.job_description)?;
        writeln!(f, "Требования: {}", self.candidate_requirements)?;
        writeln!(f, "Условия: {}", self.working_conditions)?;
        writeln!(f, "Местоположение: {}", self.location)?;
        writeln!(f, "Контакты: {}", self.contact_info)?;
        write!(f, "Ссылка: {}", self.url)
    }
}
