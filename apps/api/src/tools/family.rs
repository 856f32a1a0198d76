//! Family-activity tool: extracts a structured request from conversation
//! text, asks a follow-up question when required fields are missing, and
//! otherwise searches KudaGo and stores event summaries with a TTL.

use async_trait::async_trait;
use serde_json::{json, Map, Value};
use std::sync::Arc;
use tracing::{debug, warn};

use crate::kudago::{build_event_query, Event, KudaGoClient};
use crate::llm::{call_json, prompts, ChatModel, ToolDescriptor};
use crate::models::activity::{time_slots_for_date, ActivityRequest, TimeSlot};
use crate::store::freshness::FreshnessStore;
use crate::tools::work::VACANCY_TTL_MILLIS;
use crate::tools::{string_arg, Tool};

const MAX_PRESENTED_EVENTS: usize = 5;
const DESCRIPTION_PREVIEW_CHARS: usize = 150;

const NO_REQUEST_REPLY: &str =
    "Извините, но я не смог определить ваш запрос. Пожалуйста, уточните, что вы ищете.";
const NO_EVENTS_REPLY: &str = "К сожалению, я не смог найти подходящие мероприятия по вашему запросу. Попробуйте изменить параметры поиска или выбрать другую дату.";

/// Event summaries share the vacancy TTL: two days.
const EVENT_TTL_MILLIS: i64 = VACANCY_TTL_MILLIS;

pub struct FamilyTools {
    model: Arc<dyn ChatModel>,
    kudago: Arc<KudaGoClient>,
    store: Arc<FreshnessStore>,
}

impl FamilyTools {
    pub fn new(
        model: Arc<dyn ChatModel>,
        kudago: Arc<KudaGoClient>,
        store: Arc<FreshnessStore>,
    ) -> Self {
        Self {
            model,
            kudago,
            store,
        }
    }

    /// Finds family activities for a conversational request. Always returns
    /// presentable text: a recommendation list, a follow-up question, or an
    /// apology.
    pub async fn find_family_activities(&self, query: &str) -> String {
        let Some(request) = self.extract_request(query).await else {
            return NO_REQUEST_REPLY.to_string();
        };

        let missing = request.missing_fields();
        if !missing.is_empty() {
            let role = request
                .family_member
                .as_ref()
                .and_then(|m| m.role.as_deref());
            return self.follow_up_question(&missing, role).await;
        }

        let slot = self.pick_time_slot(&request);

        let event_query = build_event_query(&request, self.store.now_millis() / 1000);
        let events = self.kudago.search_events(&event_query).await;
        if events.is_empty() {
            return NO_EVENTS_REPLY.to_string();
        }

        self.persist(&request, &events).await;
        format_activity_response(&request, &events, slot.as_ref())
    }

    async fn extract_request(&self, message: &str) -> Option<ActivityRequest> {
        debug!("extracting activity request from message");
        match call_json::<ActivityRequest>(
            self.model.as_ref(),
            prompts::ACTIVITY_EXTRACT_SYSTEM,
            message,
        )
        .await
        {
            Ok(request) => Some(request),
            Err(e) => {
                warn!("activity request extraction failed: {e}");
                None
            }
        }
    }

    /// Generates one natural follow-up question for the missing fields, with
    /// a fixed Russian fallback when the model itself fails.
    async fn follow_up_question(&self, missing: &[&str], role: Option<&str>) -> String {
        let system = prompts::FOLLOW_UP_SYSTEM_TEMPLATE
            .replace("{missing_fields}", &missing.join("\n"))
            .replace("{family_member_role}", role.unwrap_or("неизвестно"));

        match self.model.call(&system, "Сформируй уточняющий вопрос").await {
            Ok(question) if !question.trim().is_empty() => question.trim().to_string(),
            Ok(_) | Err(_) => prompts::FOLLOW_UP_FALLBACK.to_string(),
        }
    }

    fn pick_time_slot(&self, request: &ActivityRequest) -> Option<TimeSlot> {
        if !request.needs_time_slot_selection {
            return None;
        }
        let date = request.preferred_date.as_deref()?;
        time_slots_for_date(date).into_iter().next()
    }

    /// Persists event summaries with a TTL and family facts permanently.
    /// Best-effort: write failures are logged, the reply is built regardless.
    async fn persist(&self, request: &ActivityRequest, events: &[Event]) {
        let expires_at = self.store.now_millis() + EVENT_TTL_MILLIS;
        for event in events {
            if let Err(e) = self.store.add_with_ttl(event.summary(), expires_at).await {
                warn!("failed to persist event summary: {e}");
            }
        }

        if let Some(member) = &request.family_member {
            if let (Some(role), Some(age)) = (&member.role, member.age) {
                let mut metadata = Map::new();
                metadata.insert("type".to_string(), json!("family_member"));
                let mut fact = format!("Член семьи: {role}, возраст {age}");
                if let Some(activity) = &request.activity_type {
                    fact.push_str(&format!(", интересуется: {activity}"));
                }
                if let Err(e) = self.store.add_permanent(fact, metadata).await {
                    warn!("failed to persist family fact: {e}");
                }
            }
        }
    }
}

fn format_activity_response(
    request: &ActivityRequest,
    events: &[Event],
    slot: Option<&TimeSlot>,
) -> String {
    let member_info = request
        .family_member
        .as_ref()
        .and_then(|m| {
            m.role
                .as_ref()
                .map(|role| match m.age {
                    Some(age) => format!("{role} {age}"),
                    None => role.clone(),
                })
        })
        .unwrap_or_default();

    let intro = if member_info.is_empty() {
        "Вот что я нашел:".to_string()
    } else {
        format!("Вот что я нашел для {member_info}:")
    };

    let formatted: Vec<String> = events
        .iter()
        .take(MAX_PRESENTED_EVENTS)
        .enumerate()
        .map(|(i, event)| {
            let description: String = event.description.chars().take(DESCRIPTION_PREVIEW_CHARS).collect();
            let ellipsis = if event.description.chars().count() > DESCRIPTION_PREVIEW_CHARS {
                "..."
            } else {
                ""
            };
            let location = event
                .place
                .as_ref()
                .map(|p| {
                    if p.address.is_empty() {
                        p.title.clone()
                    } else {
                        format!("{}, {}", p.title, p.address)
                    }
                })
                .filter(|l| !l.is_empty())
                .unwrap_or_else(|| "Место не указано".to_string());

            format!(
                "{}. **{}**\n📍 {}\n{}{}",
                i + 1,
                event.title,
                location,
                description.trim(),
                ellipsis
            )
        })
        .collect();

    let mut reply = format!("{intro}\n\n{}", formatted.join("\n\n"));
    if let Some(slot) = slot {
        reply.push_str(&format!(
            "\n\nПредлагаю время: {} {}",
            slot.date, slot.time_range
        ));
    }
    reply
}

#[async_trait]
impl Tool for FamilyTools {
    fn descriptor(&self) -> ToolDescriptor {
        ToolDescriptor::function(
            "find_family_activities",
            "Функция для поиска мероприятий для семейного досуга",
            json!({
                "type": "object",
                "properties": {
                    "request": {
                        "type": "string",
                        "description": "Запрос пользователя о семейном досуге"
                    }
                },
                "required": ["request"]
            }),
        )
    }

    async fn invoke(&self, arguments: &Value) -> String {
        self.find_family_activities(&string_arg(arguments, "request"))
            .await
    }
}
