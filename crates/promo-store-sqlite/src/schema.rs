//! SQL schema for the promo-code SQLite store.
//!
//! Executed once at connection startup. Future migrations will be gated on
//! `PRAGMA user_version`.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

CREATE TABLE IF NOT EXISTS partners (
    partner_id                TEXT PRIMARY KEY,
    name                      TEXT    NOT NULL,
    is_active                 INTEGER NOT NULL,
    number_issued_promo_codes INTEGER NOT NULL DEFAULT 0,
    version                   INTEGER NOT NULL   -- bumped on every save
);

-- Limit history is append-only; cancel_date is the only column ever updated.
CREATE TABLE IF NOT EXISTS partner_limits (
    limit_id    TEXT PRIMARY KEY,
    partner_id  TEXT    NOT NULL REFERENCES partners(partner_id),
    seq         INTEGER NOT NULL,   -- position in the partner's history
    limit_value INTEGER NOT NULL CHECK (limit_value > 0),
    create_date TEXT    NOT NULL,   -- ISO 8601 UTC
    end_date    TEXT    NOT NULL,
    cancel_date TEXT,
    UNIQUE (partner_id, seq)
);

CREATE TABLE IF NOT EXISTS preferences (
    preference_id TEXT PRIMARY KEY,
    name          TEXT NOT NULL UNIQUE
);

CREATE TABLE IF NOT EXISTS customers (
    customer_id TEXT PRIMARY KEY,
    first_name  TEXT NOT NULL,
    last_name   TEXT NOT NULL,
    email       TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS customer_preferences (
    customer_id   TEXT NOT NULL REFERENCES customers(customer_id),
    preference_id TEXT NOT NULL REFERENCES preferences(preference_id),
    PRIMARY KEY (customer_id, preference_id)
);

CREATE TABLE IF NOT EXISTS promo_codes (
    promo_code_id TEXT PRIMARY KEY,
    code          TEXT NOT NULL,
    service_info  TEXT NOT NULL,
    begin_date    TEXT NOT NULL,
    end_date      TEXT NOT NULL,
    partner_name  TEXT NOT NULL,
    customer_id   TEXT NOT NULL REFERENCES customers(customer_id),
    preference_id TEXT NOT NULL REFERENCES preferences(preference_id)
);

CREATE INDEX IF NOT EXISTS partner_limits_partner_idx ON partner_limits(partner_id);
CREATE INDEX IF NOT EXISTS customer_preferences_pref_idx ON customer_preferences(preference_id);
CREATE INDEX IF NOT EXISTS promo_codes_customer_idx ON promo_codes(customer_id);

PRAGMA user_version = 1;
";
