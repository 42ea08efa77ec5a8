//! PostgreSQL persistence for bots, sessions, events, alerts, and novel
//! patterns.
//!
//! A shared `PgPool`, embedded migrations run once at connect, and
//! runtime-checked `sqlx::query`/`query_scalar` (not the compile-time
//! `query!` macros, which need a live database at build time) with manual
//! row extraction via `Row::get`.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use sentinel_types::{
    Alert, Bot, BotStatus, Event, EventLevel, EventType, Mode, NovelPattern, Session, SessionPatch, Turn,
};
use sqlx::{postgres::PgRow, PgPool, Row};

/// Aggregate fleet counts, as broadcast on `fleet:status` (§4.10).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FleetCounts {
    pub online: i64,
    pub offline: i64,
    pub degraded: i64,
    pub active_sessions: i64,
}

/// Filter parameters for `GET /api/events` (§4.8).
#[derive(Debug, Clone, Default)]
pub struct EventFilter {
    pub bot_id: Option<String>,
    pub user_id: Option<String>,
    pub session_id: Option<String>,
    pub event_type: Option<String>,
    pub level: Option<String>,
    pub min_score: Option<f64>,
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
    pub limit: i64,
    pub offset: i64,
}

#[derive(Clone)]
pub struct Store {
    pool: Arc<PgPool>,
}

impl Store {
    /// Connects to `database_url` and runs embedded migrations. A migration
    /// failure here is a fatal boot error (§7).
    pub async fn connect(database_url: &str) -> Result<Self, sqlx::Error> {
        let pool = PgPool::connect(database_url).await?;
        sqlx::migrate!("./migrations").run(&pool).await?;
        Ok(Self { pool: Arc::new(pool) })
    }

    /// UPSERT on `bot_id` (§4.8, §8 invariant 7).
    pub async fn upsert_bot(&self, bot: &Bot) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            INSERT INTO bots (bot_id, persona_category, persona_name, company_name, status, last_heartbeat, config_hash, metadata)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8::jsonb)
            ON CONFLICT (bot_id) DO UPDATE SET
                persona_category = EXCLUDED.persona_category,
                persona_name = EXCLUDED.persona_name,
                company_name = EXCLUDED.company_name,
                status = EXCLUDED.status,
                last_heartbeat = EXCLUDED.last_heartbeat,
                config_hash = EXCLUDED.config_hash,
                metadata = EXCLUDED.metadata
            "#,
        )
        .bind(&bot.bot_id)
        .bind(&bot.persona_category)
        .bind(&bot.persona_name)
        .bind(&bot.company_name)
        .bind(status_str(bot.status))
        .bind(bot.last_heartbeat)
        .bind(&bot.config_hash)
        .bind(&bot.metadata)
        .execute(&*self.pool)
        .await?;
        Ok(())
    }

    /// Updates `status` and `last_heartbeat` for an already-registered bot.
    /// A heartbeat from an unknown bot is a no-op (0 rows affected); the
    /// caller treats that as `NotFound`.
    pub async fn record_heartbeat(&self, bot_id: &str, status: BotStatus, now: DateTime<Utc>) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("UPDATE bots SET status = $2, last_heartbeat = $3 WHERE bot_id = $1")
            .bind(bot_id)
            .bind(status_str(status))
            .bind(now)
            .execute(&*self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn insert_event(&self, event: &Event) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            INSERT INTO events (event_id, bot_id, event_type, level, user_id, session_id, threat_score,
                detection_types, message_content, message_hash, analysis_result, metadata, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8::jsonb, $9, $10, $11::jsonb, $12::jsonb, $13)
            "#,
        )
        .bind(event.event_id)
        .bind(&event.bot_id)
        .bind(event_type_str(event.event_type))
        .bind(level_str(event.level))
        .bind(&event.user_id)
        .bind(&event.session_id)
        .bind(event.threat_score)
        .bind(serde_json::json!(event.detection_types))
        .bind(&event.message_content)
        .bind(&event.message_hash)
        .bind(&event.analysis_result)
        .bind(&event.metadata)
        .bind(event.created_at)
        .execute(&*self.pool)
        .await?;
        Ok(())
    }

    pub async fn insert_alert(&self, alert: &Alert) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            INSERT INTO alerts (alert_id, level, title, summary, user_id, score, detections, conversation, event_id, session_id, "timestamp")
            VALUES ($1, $2, $3, $4, $5, $6, $7::jsonb, $8::jsonb, $9, $10, $11)
            "#,
        )
        .bind(alert.alert_id)
        .bind(level_str(alert.level))
        .bind(&alert.title)
        .bind(&alert.summary)
        .bind(&alert.user_id)
        .bind(alert.score)
        .bind(serde_json::to_value(&alert.detections).unwrap_or_default())
        .bind(&alert.conversation)
        .bind(alert.event_id)
        .bind(&alert.session_id)
        .bind(alert.timestamp)
        .execute(&*self.pool)
        .await?;
        Ok(())
    }

    /// Serializes concurrent occurrence-count increments for the same
    /// `pattern_hash` at the storage layer (§5, §9 open question (a)): the
    /// `ON CONFLICT` arm is an atomic read-modify-write inside Postgres,
    /// never two racing INSERTs.
    pub async fn upsert_novel_pattern(&self, pattern: &NovelPattern) -> Result<NovelPattern, sqlx::Error> {
        let row = sqlx::query(
            r#"
            INSERT INTO novel_patterns (pattern_hash, pattern_text, attack_type, occurrence_count, first_seen_at, last_seen_at, sample_contexts)
            VALUES ($1, $2, $3, $4, $5, $6, $7::jsonb)
            ON CONFLICT (pattern_hash) DO UPDATE SET
                occurrence_count = novel_patterns.occurrence_count + 1,
                last_seen_at = EXCLUDED.last_seen_at,
                sample_contexts = novel_patterns.sample_contexts || EXCLUDED.sample_contexts
            RETURNING pattern_hash, pattern_text, attack_type, occurrence_count, first_seen_at, last_seen_at, sample_contexts
            "#,
        )
        .bind(&pattern.pattern_hash)
        .bind(&pattern.pattern_text)
        .bind(&pattern.attack_type)
        .bind(pattern.occurrence_count as i64)
        .bind(pattern.first_seen_at)
        .bind(pattern.last_seen_at)
        .bind(serde_json::json!(pattern.sample_contexts))
        .fetch_one(&*self.pool)
        .await?;
        Ok(novel_pattern_from_row(&row))
    }

    /// Idempotent insert on `session_id` (§8 invariant 6): a second call
    /// with the same id is a no-op and leaves the existing row untouched.
    pub async fn insert_session_if_absent(&self, session: &Session) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            INSERT INTO sessions (session_id, bot_id, user_id, started_at, ended_at, final_mode, final_score,
                max_score, total_messages, detection_count, honeypot_responses, attack_types, conversation_log, metadata)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12::jsonb, $13::jsonb, $14::jsonb)
            ON CONFLICT (session_id) DO NOTHING
            "#,
        )
        .bind(&session.session_id)
        .bind(&session.bot_id)
        .bind(&session.user_id)
        .bind(session.started_at)
        .bind(session.ended_at)
        .bind(session.final_mode.map(mode_str))
        .bind(session.final_score)
        .bind(session.max_score)
        .bind(session.total_messages as i32)
        .bind(session.detection_count as i32)
        .bind(session.honeypot_responses as i32)
        .bind(serde_json::json!(session.attack_types))
        .bind(serde_json::to_value(&session.conversation_log).unwrap_or_default())
        .bind(&session.metadata)
        .execute(&*self.pool)
        .await?;
        Ok(())
    }

    /// Field-wise partial update (§4.8, §6): loads, applies
    /// [`Session::apply_patch`], writes back. Returns `None` if no such
    /// session exists.
    pub async fn patch_session(&self, session_id: &str, patch: SessionPatch) -> Result<Option<Session>, sqlx::Error> {
        let mut tx = self.pool.begin().await?;
        let row_opt: Option<PgRow> = sqlx::query("SELECT * FROM sessions WHERE session_id = $1 FOR UPDATE")
            .bind(session_id)
            .fetch_optional(&mut *tx)
            .await?;
        let Some(row) = row_opt else {
            return Ok(None);
        };
        let mut session = session_from_row(&row);
        session.apply_patch(patch);

        sqlx::query(
            r#"
            UPDATE sessions SET
                ended_at = $2, final_mode = $3, final_score = $4, max_score = $5,
                total_messages = $6, detection_count = $7, honeypot_responses = $8,
                attack_types = $9::jsonb, metadata = $10::jsonb
            WHERE session_id = $1
            "#,
        )
        .bind(&session.session_id)
        .bind(session.ended_at)
        .bind(session.final_mode.map(mode_str))
        .bind(session.final_score)
        .bind(session.max_score)
        .bind(session.total_messages as i32)
        .bind(session.detection_count as i32)
        .bind(session.honeypot_responses as i32)
        .bind(serde_json::json!(session.attack_types))
        .bind(&session.metadata)
        .execute(&mut *tx)
        .await?;
        tx.commit().await?;
        Ok(Some(session))
    }

    /// Returns the session with its full `conversation_log`, for `GET
    /// /api/sessions/:sessionId/replay`.
    pub async fn get_session(&self, session_id: &str) -> Result<Option<Session>, sqlx::Error> {
        let row_opt: Option<PgRow> = sqlx::query("SELECT * FROM sessions WHERE session_id = $1")
            .bind(session_id)
            .fetch_optional(&*self.pool)
            .await?;
        Ok(row_opt.as_ref().map(session_from_row))
    }

    /// Appends one turn to a session's `conversation_log` and keeps its
    /// roll-ups consistent, via [`Session::record_turn`].
    pub async fn record_turn(&self, session_id: &str, turn: Turn) -> Result<(), sqlx::Error> {
        let mut tx = self.pool.begin().await?;
        let row_opt: Option<PgRow> = sqlx::query("SELECT * FROM sessions WHERE session_id = $1 FOR UPDATE")
            .bind(session_id)
            .fetch_optional(&mut *tx)
            .await?;
        let Some(row) = row_opt else {
            return Ok(());
        };
        let mut session = session_from_row(&row);
        session.record_turn(turn);
        sqlx::query(
            r#"
            UPDATE sessions SET
                final_mode = $2, final_score = $3, max_score = $4,
                total_messages = $5, detection_count = $6, honeypot_responses = $7,
                conversation_log = $8::jsonb
            WHERE session_id = $1
            "#,
        )
        .bind(&session.session_id)
        .bind(session.final_mode.map(mode_str))
        .bind(session.final_score)
        .bind(session.max_score)
        .bind(session.total_messages as i32)
        .bind(session.detection_count as i32)
        .bind(session.honeypot_responses as i32)
        .bind(serde_json::to_value(&session.conversation_log).unwrap_or_default())
        .execute(&mut *tx)
        .await?;
        tx.commit().await?;
        Ok(())
    }

    pub async fn query_events(&self, filter: &EventFilter) -> Result<Vec<Event>, sqlx::Error> {
        let mut sql = String::from("SELECT * FROM events WHERE 1=1");
        let mut clause = 0;
        let mut push = |fragment: &str| {
            clause += 1;
            sql.push_str(&fragment.replace("$N", &format!("${clause}")));
        };
        if filter.bot_id.is_some() {
            push(" AND bot_id = $N");
        }
        if filter.user_id.is_some() {
            push(" AND user_id = $N");
        }
        if filter.session_id.is_some() {
            push(" AND session_id = $N");
        }
        if filter.event_type.is_some() {
            push(" AND event_type = $N");
        }
        if filter.level.is_some() {
            push(" AND level = $N");
        }
        if filter.min_score.is_some() {
            push(" AND threat_score >= $N");
        }
        if filter.from.is_some() {
            push(" AND created_at >= $N");
        }
        if filter.to.is_some() {
            push(" AND created_at <= $N");
        }
        sql.push_str(" ORDER BY created_at DESC LIMIT $N");
        clause += 1;
        sql = sql.replace("LIMIT $N", &format!("LIMIT ${clause}"));
        clause += 1;
        sql.push_str(&format!(" OFFSET ${clause}"));

        let mut query = sqlx::query(&sql);
        if let Some(v) = &filter.bot_id {
            query = query.bind(v);
        }
        if let Some(v) = &filter.user_id {
            query = query.bind(v);
        }
        if let Some(v) = &filter.session_id {
            query = query.bind(v);
        }
        if let Some(v) = &filter.event_type {
            query = query.bind(v);
        }
        if let Some(v) = &filter.level {
            query = query.bind(v);
        }
        if let Some(v) = filter.min_score {
            query = query.bind(v);
        }
        if let Some(v) = filter.from {
            query = query.bind(v);
        }
        if let Some(v) = filter.to {
            query = query.bind(v);
        }
        query = query.bind(filter.limit).bind(filter.offset);

        let rows = query.fetch_all(&*self.pool).await?;
        Ok(rows.iter().map(event_from_row).collect())
    }

    /// Bot counts by status plus the number of sessions still open
    /// (`ended_at IS NULL`), for the periodic `fleet:status` broadcast.
    pub async fn fleet_counts(&self) -> Result<FleetCounts, sqlx::Error> {
        let rows = sqlx::query("SELECT status, count(*) AS n FROM bots GROUP BY status").fetch_all(&*self.pool).await?;
        let mut counts = FleetCounts::default();
        for row in &rows {
            let n: i64 = row.get("n");
            match row.get::<String, _>("status").as_str() {
                "online" => counts.online = n,
                "offline" => counts.offline = n,
                "degraded" => counts.degraded = n,
                _ => {}
            }
        }
        counts.active_sessions = sqlx::query_scalar("SELECT count(*) FROM sessions WHERE ended_at IS NULL").fetch_one(&*self.pool).await?;
        Ok(counts)
    }
}

fn status_str(status: BotStatus) -> &'static str {
    match status {
        BotStatus::Online => "online",
        BotStatus::Offline => "offline",
        BotStatus::Degraded => "degraded",
    }
}

fn event_type_str(event_type: EventType) -> &'static str {
    match event_type {
        EventType::Message => "message",
        EventType::Detection => "detection",
        EventType::HoneypotActivated => "honeypot_activated",
        EventType::UserBlocked => "user_blocked",
        EventType::Alert => "alert",
    }
}

fn level_str(level: EventLevel) -> &'static str {
    match level {
        EventLevel::Info => "info",
        EventLevel::Warning => "warning",
        EventLevel::Critical => "critical",
    }
}

fn mode_str(mode: Mode) -> &'static str {
    match mode {
        Mode::Normal => "normal",
        Mode::Monitoring => "monitoring",
        Mode::Honeypot => "honeypot",
        Mode::Blocked => "blocked",
    }
}

fn event_from_row(row: &PgRow) -> Event {
    let event_type = match row.get::<String, _>("event_type").as_str() {
        "detection" => EventType::Detection,
        "honeypot_activated" => EventType::HoneypotActivated,
        "user_blocked" => EventType::UserBlocked,
        "alert" => EventType::Alert,
        _ => EventType::Message,
    };
    let level = match row.get::<String, _>("level").as_str() {
        "warning" => EventLevel::Warning,
        "critical" => EventLevel::Critical,
        _ => EventLevel::Info,
    };
    let detection_types: serde_json::Value = row.get("detection_types");
    Event {
        event_id: row.get("event_id"),
        bot_id: row.get("bot_id"),
        event_type,
        level,
        user_id: row.get("user_id"),
        session_id: row.get("session_id"),
        threat_score: row.get("threat_score"),
        detection_types: serde_json::from_value(detection_types).unwrap_or_default(),
        message_content: row.get("message_content"),
        message_hash: row.get("message_hash"),
        analysis_result: row.get("analysis_result"),
        metadata: row.get("metadata"),
        created_at: row.get("created_at"),
    }
}

fn session_from_row(row: &PgRow) -> Session {
    let final_mode: Option<String> = row.get("final_mode");
    let attack_types: serde_json::Value = row.get("attack_types");
    let conversation_log: serde_json::Value = row.get("conversation_log");
    Session {
        session_id: row.get("session_id"),
        bot_id: row.get("bot_id"),
        user_id: row.get("user_id"),
        started_at: row.get("started_at"),
        ended_at: row.get("ended_at"),
        final_mode: final_mode.as_deref().map(parse_mode),
        final_score: row.get("final_score"),
        max_score: row.get("max_score"),
        total_messages: row.get::<i32, _>("total_messages") as u32,
        detection_count: row.get::<i32, _>("detection_count") as u32,
        honeypot_responses: row.get::<i32, _>("honeypot_responses") as u32,
        attack_types: serde_json::from_value(attack_types).unwrap_or_default(),
        conversation_log: serde_json::from_value(conversation_log).unwrap_or_default(),
        metadata: row.get("metadata"),
    }
}

fn parse_mode(raw: &str) -> Mode {
    match raw {
        "monitoring" => Mode::Monitoring,
        "honeypot" => Mode::Honeypot,
        "blocked" => Mode::Blocked,
        _ => Mode::Normal,
    }
}

fn novel_pattern_from_row(row: &PgRow) -> NovelPattern {
    let sample_contexts: serde_json::Value = row.get("sample_contexts");
    NovelPattern {
        pattern_hash: row.get("pattern_hash"),
        pattern_text: row.get("pattern_text"),
        attack_type: row.get("attack_type"),
        occurrence_count: row.get::<i64, _>("occurrence_count") as u64,
        first_seen_at: row.get("first_seen_at"),
        last_seen_at: row.get("last_seen_at"),
        sample_contexts: serde_json::from_value(sample_contexts).unwrap_or_default(),
    }
}
