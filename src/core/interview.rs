use crate::core::api::ApiClient;
use crate::domain::model::{InterviewAnswer, InterviewQuestion, InterviewSession};
use crate::utils::error::{DeskError, Result};
use serde::Serialize;
use serde_json::Value;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum InterviewStep {
    CameraSetup,
    IdVerification,
    ScreenPermission,
    Recording,
    QuestionAnswer,
    Completed,
}

impl fmt::Display for InterviewStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            InterviewStep::CameraSetup => "camera setup",
            InterviewStep::IdVerification => "ID verification",
            InterviewStep::ScreenPermission => "screen permission",
            InterviewStep::Recording => "recording",
            InterviewStep::QuestionAnswer => "questions",
            InterviewStep::Completed => "completion",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum InterviewEvent {
    CameraReady,
    IdVerified { verified: bool },
    ScreenShared,
    RecordingStarted,
    AnswerSubmitted(InterviewAnswer),
    Finish,
}

impl InterviewEvent {
    fn name(&self) -> &'static str {
        match self {
            InterviewEvent::CameraReady => "camera-ready",
            InterviewEvent::IdVerified { .. } => "id-verified",
            InterviewEvent::ScreenShared => "screen-shared",
            InterviewEvent::RecordingStarted => "recording-started",
            InterviewEvent::AnswerSubmitted(_) => "answer-submitted",
            InterviewEvent::Finish => "finish",
        }
    }
}

/// Linear candidate-side interview wizard.
///
/// Each step accepts exactly one kind of event; anything else is rejected and
/// leaves the wizard where it was. A failed ID check keeps the candidate on
/// the verification step so they can retry.
#[derive(Debug, Clone)]
pub struct InterviewWizard {
    session: InterviewSession,
    step: InterviewStep,
    answers: Vec<InterviewAnswer>,
}

impl InterviewWizard {
    pub fn new(session: InterviewSession) -> Self {
        Self {
            session,
            step: InterviewStep::CameraSetup,
            answers: Vec::new(),
        }
    }

    pub fn step(&self) -> InterviewStep {
        self.step
    }

    pub fn session(&self) -> &InterviewSession {
        &self.session
    }

    pub fn answers(&self) -> &[InterviewAnswer] {
        &self.answers
    }

    pub fn current_question(&self) -> Option<&InterviewQuestion> {
        if self.step != InterviewStep::QuestionAnswer {
            return None;
        }
        self.session.questions.get(self.answers.len())
    }

    pub fn remaining_questions(&self) -> usize {
        self.session.questions.len().saturating_sub(self.answers.len())
    }

    fn reject(&self, event: &InterviewEvent) -> DeskError {
        DeskError::InterviewFlowError {
            step: self.step.to_string(),
            event: event.name().to_string(),
        }
    }

    pub fn apply(&mut self, event: InterviewEvent) -> Result<InterviewStep> {
        let next = match (self.step, &event) {
            (InterviewStep::CameraSetup, InterviewEvent::CameraReady) => InterviewStep::IdVerification,
            (InterviewStep::IdVerification, InterviewEvent::IdVerified { verified: true }) => {
                InterviewStep::ScreenPermission
            }
            (InterviewStep::IdVerification, InterviewEvent::IdVerified { verified: false }) => {
                tracing::info!("ID verification failed for session {}", self.session.session_key);
                InterviewStep::IdVerification
            }
            (InterviewStep::ScreenPermission, InterviewEvent::ScreenShared) => InterviewStep::Recording,
            (InterviewStep::Recording, InterviewEvent::RecordingStarted) => InterviewStep::QuestionAnswer,
            (InterviewStep::QuestionAnswer, InterviewEvent::AnswerSubmitted(answer)) => {
                let expected = self.current_question().map(|q| q.id);
                if expected != Some(answer.question_id) {
                    return Err(self.reject(&event));
                }
                self.answers.push(answer.clone());
                InterviewStep::QuestionAnswer
            }
            (InterviewStep::QuestionAnswer, InterviewEvent::Finish) if self.remaining_questions() == 0 => {
                InterviewStep::Completed
            }
            _ => return Err(self.reject(&event)),
        };

        if next != self.step {
            tracing::debug!("Interview {}: {} -> {}", self.session.session_key, self.step, next);
        }
        self.step = next;
        Ok(next)
    }
}

/// Wizard bound to the backend: every accepted event is mirrored to the
/// interview app endpoints.
pub struct InterviewPortal<'a> {
    client: &'a ApiClient,
    wizard: InterviewWizard,
}

impl<'a> InterviewPortal<'a> {
    pub async fn open(client: &'a ApiClient, session_key: &str) -> Result<Self> {
        let session = client.interview_session(session_key).await?;
        tracing::info!(
            "Opened interview {} with {} questions",
            session.session_key,
            session.questions.len()
        );
        Ok(Self {
            client,
            wizard: InterviewWizard::new(session),
        })
    }

    pub fn wizard(&self) -> &InterviewWizard {
        &self.wizard
    }

    pub fn camera_ready(&mut self) -> Result<InterviewStep> {
        self.wizard.apply(InterviewEvent::CameraReady)
    }

    pub async fn verify_identity(&mut self, document: &Value) -> Result<InterviewStep> {
        if self.wizard.step() != InterviewStep::IdVerification {
            return self.wizard.apply(InterviewEvent::IdVerified { verified: false });
        }
        let key = self.wizard.session().session_key.clone();
        let verified = self.client.verify_identity(&key, document).await?;
        self.wizard.apply(InterviewEvent::IdVerified { verified })
    }

    pub fn screen_shared(&mut self) -> Result<InterviewStep> {
        self.wizard.apply(InterviewEvent::ScreenShared)
    }

    pub fn recording_started(&mut self) -> Result<InterviewStep> {
        self.wizard.apply(InterviewEvent::RecordingStarted)
    }

    pub async fn answer(&mut self, answer_text: &str, duration_seconds: u32) -> Result<InterviewStep> {
        let question_id = self
            .wizard
            .current_question()
            .map(|q| q.id)
            .ok_or_else(|| DeskError::InterviewFlowError {
                step: self.wizard.step().to_string(),
                event: "answer-submitted".to_string(),
            })?;
        let answer = InterviewAnswer {
            question_id,
            answer_text: answer_text.to_string(),
            duration_seconds,
        };
        let key = self.wizard.session().session_key.clone();
        self.client.submit_answer(&key, &answer).await?;
        self.wizard.apply(InterviewEvent::AnswerSubmitted(answer))
    }

    /// Completes the session; returns the id results are published under.
    pub async fn finish(&mut self) -> Result<String> {
        if self.wizard.remaining_questions() > 0 || self.wizard.step() != InterviewStep::QuestionAnswer {
            return Err(DeskError::InterviewFlowError {
                step: self.wizard.step().to_string(),
                event: "finish".to_string(),
            });
        }
        let key = self.wizard.session().session_key.clone();
        let session_id = self.client.complete_interview(&key).await?;
        self.wizard.apply(InterviewEvent::Finish)?;
        Ok(session_id)
    }
}

/// Route of the results page for a completed session.
pub fn results_path(session_id: &str) -> String {
    format!("/interview-results/{}", session_id)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session(questions: usize) -> InterviewSession {
        InterviewSession {
            session_key: "abc".to_string(),
            session_id: None,
            candidate_name: "Ada".to_string(),
            job_title: "Engineer".to_string(),
            questions: (1..=questions as i64)
                .map(|id| InterviewQuestion {
                    id,
                    text: format!("Question {}", id),
                    time_limit_seconds: Some(120),
                })
                .collect(),
            status: "scheduled".to_string(),
        }
    }

    fn answer(question_id: i64) -> InterviewEvent {
        InterviewEvent::AnswerSubmitted(InterviewAnswer {
            question_id,
            answer_text: "answer".to_string(),
            duration_seconds: 30,
        })
    }

    fn through_recording(wizard: &mut InterviewWizard) {
        wizard.apply(InterviewEvent::CameraReady).unwrap();
        wizard.apply(InterviewEvent::IdVerified { verified: true }).unwrap();
        wizard.apply(InterviewEvent::ScreenShared).unwrap();
        wizard.apply(InterviewEvent::RecordingStarted).unwrap();
    }

    #[test]
    fn test_happy_path() {
        let mut wizard = InterviewWizard::new(session(2));
        through_recording(&mut wizard);
        assert_eq!(wizard.step(), InterviewStep::QuestionAnswer);
        assert_eq!(wizard.current_question().unwrap().id, 1);

        wizard.apply(answer(1)).unwrap();
        wizard.apply(answer(2)).unwrap();
        assert!(wizard.current_question().is_none());
        assert_eq!(wizard.apply(InterviewEvent::Finish).unwrap(), InterviewStep::Completed);
        assert_eq!(wizard.answers().len(), 2);
    }

    #[test]
    fn test_steps_cannot_be_skipped() {
        let mut wizard = InterviewWizard::new(session(1));
        let err = wizard.apply(InterviewEvent::ScreenShared).unwrap_err();
        assert!(matches!(err, DeskError::InterviewFlowError { .. }));
        assert_eq!(wizard.step(), InterviewStep::CameraSetup);
    }

    #[test]
    fn test_failed_id_check_stays_on_step() {
        let mut wizard = InterviewWizard::new(session(1));
        wizard.apply(InterviewEvent::CameraReady).unwrap();
        assert_eq!(
            wizard.apply(InterviewEvent::IdVerified { verified: false }).unwrap(),
            InterviewStep::IdVerification
        );
        assert_eq!(
            wizard.apply(InterviewEvent::IdVerified { verified: true }).unwrap(),
            InterviewStep::ScreenPermission
        );
    }

    #[test]
    fn test_finish_requires_all_answers_in_order() {
        let mut wizard = InterviewWizard::new(session(2));
        through_recording(&mut wizard);

        assert!(wizard.apply(answer(2)).is_err());
        wizard.apply(answer(1)).unwrap();
        assert!(wizard.apply(InterviewEvent::Finish).is_err());
        assert_eq!(wizard.remaining_questions(), 1);
    }

    #[test]
    fn test_results_path() {
        assert_eq!(results_path("42"), "/interview-results/42");
    }
}
