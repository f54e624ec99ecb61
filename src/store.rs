use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::types::Type;
use rusqlite::{Connection, OptionalExtension, Row, params};
use std::sync::{Arc, Mutex};
use tracing::info;
use uuid::Uuid;

use crate::models::{Contact, Lead, LeadType, NewContact, NewLead, NewsletterSignup};

// Persistence for form submissions
#[async_trait]
pub trait LeadStore: Send + Sync {
    async fn create_contact(&self, contact: NewContact) -> Result<Contact>;

    async fn create_lead(&self, lead: NewLead) -> Result<Lead>;

    // oldest lead with this exact email and type
    async fn find_lead(&self, email: &str, lead_type: LeadType) -> Result<Option<Lead>>;

    // inserts a NEWSLETTER lead unless one exists for the email, atomically
    async fn subscribe_newsletter(&self, email: &str) -> Result<NewsletterSignup>;

    async fn count_leads(&self) -> Result<usize>;
}

// SQLite-backed store. Calls run on the blocking pool, one at a time
#[derive(Clone)]
pub struct SqliteStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteStore {
    pub fn open(path: &str) -> Result<Self> {
        let conn = Connection::open(path).context("Failed to open SQLite database")?;
        let store = Self::with_connection(conn)?;
        info!(path = %path, "lead store opened");
        Ok(store)
    }

    // for tests
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().context("Failed to open in-memory SQLite")?;
        Self::with_connection(conn)
    }

    fn with_connection(conn: Connection) -> Result<Self> {
        init_schema(&conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    async fn run<T, F>(&self, f: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&Connection) -> Result<T> + Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let conn = conn
                .lock()
                .map_err(|_| anyhow!("lead store mutex poisoned"))?;
            f(&conn)
        })
        .await
        .context("lead store task failed")?
    }
}

fn init_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS contacts (
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            email TEXT NOT NULL,
            subject TEXT NOT NULL,
            message TEXT NOT NULL,
            created_at TEXT NOT NULL
        );
        CREATE TABLE IF NOT EXISTS leads (
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            email TEXT NOT NULL,
            company TEXT NOT NULL,
            role TEXT NOT NULL,
            phone TEXT,
            message TEXT,
            lead_type TEXT NOT NULL,
            created_at TEXT NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_leads_email_type ON leads(email, lead_type);",
    )
    .context("Failed to create schema")?;
    Ok(())
}

fn lead_from_row(row: &Row<'_>) -> rusqlite::Result<Lead> {
    let lead_type: String = row.get(7)?;
    let lead_type = lead_type
        .parse::<LeadType>()
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(7, Type::Text, Box::new(e)))?;

    Ok(Lead {
        id: row.get(0)?,
        name: row.get(1)?,
        email: row.get(2)?,
        company: row.get(3)?,
        role: row.get(4)?,
        phone: row.get(5)?,
        message: row.get(6)?,
        lead_type,
        created_at: row.get::<_, DateTime<Utc>>(8)?,
    })
}

fn query_lead(conn: &Connection, email: &str, lead_type: LeadType) -> Result<Option<Lead>> {
    conn.query_row(
        "SELECT id, name, email, company, role, phone, message, lead_type, created_at
         FROM leads WHERE email = ?1 AND lead_type = ?2
         ORDER BY created_at ASC LIMIT 1",
        params![email, lead_type.as_str()],
        lead_from_row,
    )
    .optional()
    .context("Failed to look up lead")
}

fn insert_lead(conn: &Connection, lead: NewLead) -> Result<Lead> {
    let record = Lead {
        id: Uuid::new_v4().to_string(),
        name: lead.name,
        email: lead.email,
        company: lead.company,
        role: lead.role,
        phone: lead.phone,
        message: lead.message,
        lead_type: lead.lead_type,
        created_at: Utc::now(),
    };
    conn.execute(
        "INSERT INTO leads (id, name, email, company, role, phone, message, lead_type, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
        params![
            record.id,
            record.name,
            record.email,
            record.company,
            record.role,
            record.phone,
            record.message,
            record.lead_type.as_str(),
            record.created_at,
        ],
    )
    .context("Failed to insert lead")?;
    Ok(record)
}

#[async_trait]
impl LeadStore for SqliteStore {
    async fn create_contact(&self, contact: NewContact) -> Result<Contact> {
        self.run(move |conn| {
            let record = Contact {
                id: Uuid::new_v4().to_string(),
                name: contact.name,
                email: contact.email,
                subject: contact.subject,
                message: contact.message,
                created_at: Utc::now(),
            };
            conn.execute(
                "INSERT INTO contacts (id, name, email, subject, message, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    record.id,
                    record.name,
                    record.email,
                    record.subject,
                    record.message,
                    record.created_at,
                ],
            )
            .context("Failed to insert contact")?;
            Ok(record)
        })
        .await
    }

    async fn create_lead(&self, lead: NewLead) -> Result<Lead> {
        self.run(move |conn| insert_lead(conn, lead)).await
    }

    async fn find_lead(&self, email: &str, lead_type: LeadType) -> Result<Option<Lead>> {
        let email = email.to_string();
        self.run(move |conn| query_lead(conn, &email, lead_type)).await
    }

    async fn subscribe_newsletter(&self, email: &str) -> Result<NewsletterSignup> {
        let email = email.to_string();
        // lookup and insert share one lock hold, so two signups can't both insert
        self.run(move |conn| {
            if query_lead(conn, &email, LeadType::Newsletter)?.is_some() {
                return Ok(NewsletterSignup::AlreadySubscribed);
            }
            let lead = insert_lead(conn, NewLead::newsletter(email))?;
            Ok(NewsletterSignup::Created(lead))
        })
        .await
    }

    async fn count_leads(&self) -> Result<usize> {
        self.run(|conn| {
            let count: usize = conn
                .query_row("SELECT COUNT(*) FROM leads", [], |row| row.get(0))
                .context("Failed to count leads")?;
            Ok(count)
        })
        .await
    }
}
