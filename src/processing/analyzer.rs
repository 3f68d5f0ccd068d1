//! Single-resume analysis: one page image, one model call per task

use crate::error::{Result, ScreenerError};
use crate::input::page_image::{PageRenderer, ResumeDocument};
use crate::llm::client::{GenerationRequest, GenerativeModel};
use crate::llm::parser::{parse_match_percentage, ContactDetails};
use crate::llm::prompts::{PromptCatalog, Task};
use crate::llm::retry::{RetryingModel, Sleeper};
use log::info;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskResult {
    pub task: Task,
    pub response: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub match_percentage: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub contact: Option<ContactDetails>,
}

pub struct ResumeAnalyzer<'a, M, R, S> {
    model: &'a RetryingModel<M, S>,
    renderer: &'a R,
    prompts: &'a PromptCatalog,
    jpeg_quality: u8,
}

impl<'a, M, R, S> ResumeAnalyzer<'a, M, R, S>
where
    M: GenerativeModel,
    R: PageRenderer,
    S: Sleeper,
{
    pub fn new(model: &'a RetryingModel<M, S>, renderer: &'a R, prompts: &'a PromptCatalog, jpeg_quality: u8) -> Self {
        Self {
            model,
            renderer,
            prompts,
            jpeg_quality,
        }
    }

    /// Run `tasks` in order against one resume. The first failing task aborts the request.
    pub async fn analyze(
        &self,
        resume: ResumeDocument,
        job_description: &str,
        tasks: &[Task],
    ) -> Result<Vec<TaskResult>> {
        if tasks.is_empty() {
            return Err(ScreenerError::InvalidInput("No analysis task selected".to_string()));
        }
        if job_description.trim().is_empty() && tasks.iter().any(|task| task.uses_job_description()) {
            return Err(ScreenerError::InvalidInput("Please provide a job description".to_string()));
        }

        let filename = resume.filename.clone();
        let image = resume.into_page_image(self.renderer, self.jpeg_quality)?;

        let mut results = Vec::with_capacity(tasks.len());
        for &task in tasks {
            info!("Running {} on '{}'", task, filename);

            let context = if task.uses_job_description() { job_description } else { "" };
            let request = GenerationRequest {
                context,
                image: &image,
                instruction: self.prompts.instruction(task),
            };

            let response = self
                .model
                .generate(&request)
                .await
                .map_err(|err| ScreenerError::ModelUnavailable(format!("{} request: {}", task, err)))?
                .text;

            results.push(Self::interpret(task, response)?);
        }

        Ok(results)
    }

    fn interpret(task: Task, response: String) -> Result<TaskResult> {
        let mut result = TaskResult {
            task,
            response,
            match_percentage: None,
            contact: None,
        };

        match task {
            Task::Match => {
                let score = parse_match_percentage(&result.response)
                    .map_err(|e| ScreenerError::MalformedResponse(e.to_string()))?;
                result.match_percentage = Some(score);
            }
            Task::Contact => result.contact = Some(ContactDetails::parse(&result.response)),
            Task::Analysis | Task::Improve | Task::Skills => {}
        }

        Ok(result)
    }
}
