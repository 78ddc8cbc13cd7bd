//! Request/response channel between extension surfaces and the page engine.

use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::broadcast;

use crate::error::AppError;
use crate::locator::InputTarget;
use crate::models::{
    FeedbackEvent, Message, MessageResponse, PromptDraft, PromptRecord, SaveMode, ToastLevel,
    VariableForm,
};
use crate::page::{OpenForm, PageContext, PageHost};
use crate::selector::{PromptSelector, SelectorOutcome};
use crate::storage::PromptStore;
use crate::variables;

pub struct MessageRouter {
    store: Arc<dyn PromptStore>,
    host: Arc<dyn PageHost>,
    events: broadcast::Sender<FeedbackEvent>,
}

impl MessageRouter {
    pub fn new(
        store: Arc<dyn PromptStore>,
        host: Arc<dyn PageHost>,
        events: broadcast::Sender<FeedbackEvent>,
    ) -> Self {
        Self {
            store,
            host,
            events,
        }
    }

    pub fn store(&self) -> &Arc<dyn PromptStore> {
        &self.store
    }

    pub fn host(&self) -> &Arc<dyn PageHost> {
        &self.host
    }

    pub fn subscribe(&self) -> broadcast::Receiver<FeedbackEvent> {
        self.events.subscribe()
    }

    fn notify(&self, event: FeedbackEvent) {
        // No subscribers is fine
        let _ = self.events.send(event);
    }

    /// Handle one message. Failures come back as `{success: false}` replies.
    pub async fn dispatch(&self, message: Message) -> MessageResponse {
        let action = message.action();
        tracing::debug!("Handling message '{}'", action);

        match self.handle(message).await {
            Ok(response) => response,
            Err(err @ AppError::ValidationFailed(_)) => {
                let response = MessageResponse::failure(err.code(), err.to_string());
                match err {
                    AppError::ValidationFailed(errors) => response.with_errors(errors),
                    _ => response,
                }
            }
            Err(err) => {
                tracing::warn!("Message '{}' failed: {}", action, err);
                self.notify(FeedbackEvent::toast(ToastLevel::Error, err.to_string()));
                MessageResponse::failure(err.code(), err.to_string())
            }
        }
    }

    async fn handle(&self, message: Message) -> Result<MessageResponse, AppError> {
        match message {
            Message::Ping => Ok(MessageResponse::ok().with_status("alive")),
            Message::GetPrompts => {
                Ok(MessageResponse::ok().with_prompts(self.store.get_all_prompts()?))
            }
            Message::SavePrompt { data } => self.save_prompt(data),
            Message::InsertPrompt { text, prompt_id } => {
                let context = self.host.ensure_context().await?;
                let target = context.locate().await.ok_or(AppError::NoTargetFound)?;
                self.insert(&context, &target, &text, prompt_id).await
            }
            Message::InsertStructuredPrompt { prompt } => {
                let context = self.host.ensure_context().await?;
                match context.locate().await {
                    Some(target) => self.pick(&context, prompt, target).await,
                    None if variables::has_variables(&prompt.content) => {
                        self.open_form(&context, &prompt, None).await
                    }
                    None => Err(AppError::NoTargetFound),
                }
            }
            Message::SubmitVariables { prompt_id, values } => {
                self.submit_variables(&prompt_id, &values).await
            }
            Message::GetSelection => {
                let context = self.host.ensure_context().await?;
                Ok(MessageResponse::ok().with_text(context.selection_text().await?))
            }
            Message::SaveSelection => self.save_selection().await,
            Message::ShowFloatingUi => self.show_floating_ui().await,
            Message::SelectorSearch { query } => {
                let context = self.host.ensure_context().await?;
                let (items, selected) = context
                    .with_selector(|selector| {
                        selector.search(&query);
                        (selector.items(), selector.selected_index())
                    })
                    .await
                    .ok_or_else(|| AppError::ValidationError("Prompt selector is not open".into()))?;
                self.notify(FeedbackEvent::SelectorUpdated {
                    items: items.clone(),
                    selected_index: selected,
                });
                Ok(MessageResponse::ok().with_items(items, selected))
            }
            Message::SelectorKey { key } => {
                let context = self.host.ensure_context().await?;
                let outcome = context
                    .with_selector(|selector| selector.handle_key(&key))
                    .await
                    .ok_or_else(|| AppError::ValidationError("Prompt selector is not open".into()))?;
                self.selector_outcome(&context, outcome).await
            }
            Message::SelectorSelect { index } => {
                let context = self.host.ensure_context().await?;
                let picked = context
                    .with_selector(|selector| selector.select_index(index))
                    .await
                    .ok_or_else(|| AppError::ValidationError("Prompt selector is not open".into()))?
                    .ok_or_else(|| AppError::ValidationError(format!("No item at {}", index)))?;
                self.selector_outcome(&context, SelectorOutcome::Selected(picked))
                    .await
            }
        }
    }

    fn save_prompt(&self, draft: PromptDraft) -> Result<MessageResponse, AppError> {
        if draft.content.trim().is_empty() {
            return Err(AppError::ValidationError("Prompt content is empty".into()));
        }
        let prompt = self.store.save_prompt(draft)?;
        tracing::info!("Saved prompt {}", prompt.id);
        self.notify(FeedbackEvent::PromptSaved {
            prompt: prompt.clone(),
        });
        self.notify(FeedbackEvent::toast(ToastLevel::Success, "Prompt saved"));
        Ok(MessageResponse::ok().with_prompt(prompt))
    }

    /// Capture the page selection. Detailed save mode hands the text back for editing.
    async fn save_selection(&self) -> Result<MessageResponse, AppError> {
        let context = self.host.ensure_context().await?;
        let text = context.selection_text().await?;
        if text.is_empty() {
            return Err(AppError::ValidationError("No text selected".into()));
        }

        let settings = self.store.get_settings()?;
        if settings.save_mode == SaveMode::Detailed {
            return Ok(MessageResponse::ok().with_text(text));
        }

        let mut draft = PromptDraft::new(text);
        draft.category = Some(settings.default_category);
        draft.source_url = Some(context.location().await);
        self.save_prompt(draft)
    }

    async fn show_floating_ui(&self) -> Result<MessageResponse, AppError> {
        let context = self.host.ensure_context().await?;
        let target = context.locate().await.ok_or(AppError::NoTargetFound)?;

        let prompts = self.store.get_all_prompts()?;
        if prompts.is_empty() {
            self.notify(FeedbackEvent::toast(ToastLevel::Info, "No prompts saved yet"));
            return Ok(MessageResponse::failure("no_prompts", "No prompts saved yet"));
        }

        let selector = PromptSelector::new(prompts);
        let items = selector.items();
        let selected = selector.selected_index();
        context.open_selector(selector, target).await;

        self.notify(FeedbackEvent::SelectorOpened {
            items: items.clone(),
            selected_index: selected,
        });
        Ok(MessageResponse::ok().with_items(items, selected))
    }

    async fn selector_outcome(
        &self,
        context: &Arc<PageContext>,
        outcome: SelectorOutcome,
    ) -> Result<MessageResponse, AppError> {
        match outcome {
            SelectorOutcome::Updated => {
                let (items, selected) = context
                    .with_selector(|selector| (selector.items(), selector.selected_index()))
                    .await
                    .unwrap_or_default();
                self.notify(FeedbackEvent::SelectorUpdated {
                    items: items.clone(),
                    selected_index: selected,
                });
                Ok(MessageResponse::ok().with_items(items, selected))
            }
            SelectorOutcome::Closed => {
                context.close_selector().await;
                self.notify(FeedbackEvent::SelectorClosed);
                Ok(MessageResponse::ok())
            }
            SelectorOutcome::Selected(prompt) => {
                let open = context
                    .close_selector()
                    .await
                    .ok_or(AppError::NoTargetFound)?;
                self.notify(FeedbackEvent::SelectorClosed);
                self.pick(context, prompt, open.target).await
            }
        }
    }

    /// Insert a chosen prompt, or open its variable form first
    async fn pick(
        &self,
        context: &Arc<PageContext>,
        prompt: PromptRecord,
        target: InputTarget,
    ) -> Result<MessageResponse, AppError> {
        if variables::has_variables(&prompt.content) {
            return self.open_form(context, &prompt, Some(target)).await;
        }
        self.insert(context, &target, &prompt.content, Some(prompt.id))
            .await
    }

    async fn open_form(
        &self,
        context: &Arc<PageContext>,
        prompt: &PromptRecord,
        target: Option<InputTarget>,
    ) -> Result<MessageResponse, AppError> {
        let fields = variables::derive_specs(&prompt.content, &prompt.variables);
        let form = VariableForm {
            prompt_id: prompt.id.clone(),
            title: prompt.title.clone(),
            preview: variables::preview(&prompt.content, &fields),
            fields,
        };
        context
            .open_form(OpenForm {
                prompt_id: prompt.id.clone(),
                content: prompt.content.clone(),
                fields: form.fields.clone(),
                target,
            })
            .await;
        self.notify(FeedbackEvent::VariableFormOpened { form: form.clone() });
        Ok(MessageResponse::ok().with_form(form))
    }

    /// Validate against the fields the open form showed. Without an open form
    /// for `prompt_id` the stored prompt is used.
    async fn submit_variables(
        &self,
        prompt_id: &str,
        values: &HashMap<String, String>,
    ) -> Result<MessageResponse, AppError> {
        let context = self.host.ensure_context().await?;
        let form = match context.form_for(prompt_id).await {
            Some(form) => form,
            None => {
                let prompt = self.store.get_prompt(prompt_id)?;
                OpenForm {
                    fields: variables::derive_specs(&prompt.content, &prompt.variables),
                    prompt_id: prompt.id,
                    content: prompt.content,
                    target: None,
                }
            }
        };

        let report = variables::validate(&form.fields, values);
        if !report.valid {
            return Err(AppError::ValidationFailed(report.errors));
        }

        let text = variables::render(&form.content, values);
        context.close_form().await;
        let target = match form.target {
            Some(target) => target,
            None => context.locate().await.ok_or(AppError::NoTargetFound)?,
        };
        let response = self
            .insert(&context, &target, &text, Some(form.prompt_id))
            .await?;
        Ok(response.with_text(text))
    }

    async fn insert(
        &self,
        context: &Arc<PageContext>,
        target: &InputTarget,
        text: &str,
        prompt_id: Option<String>,
    ) -> Result<MessageResponse, AppError> {
        let strategy = match context.insert_into(target, text).await {
            Ok(strategy) => strategy,
            Err(err) => {
                self.notify(FeedbackEvent::InsertionFailed { prompt_id });
                return Err(err);
            }
        };

        if let Some(id) = &prompt_id {
            if let Err(e) = self.store.increment_usage(id) {
                tracing::warn!("Inserted prompt {} but could not record usage: {}", id, e);
            }
        }

        self.notify(FeedbackEvent::InsertionCompleted {
            prompt_id,
            strategy,
        });
        self.notify(FeedbackEvent::toast(ToastLevel::Success, "Prompt inserted"));
        Ok(MessageResponse::ok().with_strategy(strategy))
    }
}
