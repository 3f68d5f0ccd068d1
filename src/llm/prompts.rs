//! Instruction catalog for the screening tasks

use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// One kind of question asked about a resume
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Task {
    /// Free-form fit assessment
    Analysis,
    /// Integer match percentage
    Match,
    /// Resume improvement suggestions
    Improve,
    /// Skill gaps with learning resources
    Skills,
    /// Name, email and phone extraction
    Contact,
}

impl Task {
    pub const ALL: [Task; 5] = [Task::Analysis, Task::Match, Task::Improve, Task::Skills, Task::Contact];

    /// Whether the job description is sent along with the instruction
    pub fn uses_job_description(self) -> bool {
        !matches!(self, Task::Contact)
    }

    pub fn title(self) -> &'static str {
        match self {
            Task::Analysis => "Analysis Report",
            Task::Match => "Match Percentage",
            Task::Improve => "Recommendations",
            Task::Skills => "Skill Development Resources",
            Task::Contact => "Contact Details",
        }
    }
}

impl fmt::Display for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Task::Analysis => "analysis",
            Task::Match => "match",
            Task::Improve => "improve",
            Task::Skills => "skills",
            Task::Contact => "contact",
        };
        f.write_str(name)
    }
}

/// Immutable task → instruction table, built once and shared by reference
#[derive(Debug, Clone)]
pub struct PromptCatalog {
    instructions: HashMap<Task, String>,
}

impl PromptCatalog {
    pub fn standard() -> Self {
        let instructions = [
            (Task::Analysis, ANALYSIS_PROMPT),
            (Task::Match, MATCH_PROMPT),
            (Task::Improve, IMPROVE_PROMPT),
            (Task::Skills, SKILLS_PROMPT),
            (Task::Contact, CONTACT_PROMPT),
        ]
        .into_iter()
        .map(|(task, prompt)| (task, prompt.to_string()))
        .collect();

        Self { instructions }
    }

    pub fn instruction(&self, task: Task) -> &str {
        // every Task is inserted by `standard`
        self.instructions.get(&task).map(String::as_str).unwrap_or_default()
    }
}

impl Default for PromptCatalog {
    fn default() -> Self {
        Self::standard()
    }
}

const ANALYSIS_PROMPT: &str = "You are an experienced Technical Human Resource Manager. Your task is to review the provided resume against the job description.
Please share your professional evaluation on whether the candidate's profile aligns with the role.
Highlight the strengths and weaknesses of the applicant in relation to the specified job requirements.";

const MATCH_PROMPT: &str = "You are a skilled ATS scanner. Evaluate the resume against the job description. Return only the percentage match as an integer (e.g., 85).";

const IMPROVE_PROMPT: &str = "As a professional resume consultant, analyze the provided resume and suggest specific improvements to better align with the job description.
Focus on formatting, content relevance, and keyword optimization. Provide actionable recommendations in bullet points.";

const SKILLS_PROMPT: &str = "As a career advisor, identify 3-5 key skills the candidate lacks based on the resume and job description.
For each skill gap, recommend 2-3 free online learning resources or video tutorials (include full URLs).";

const CONTACT_PROMPT: &str = "Extract the candidate's name, email, and phone number from this resume.
Format:
Name: <name>
Email: <email>
Phone: <phone>";
