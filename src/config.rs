use std::collections::HashMap;
use std::env;
use std::str::FromStr;

use anyhow::{Context, Result};
use dotenvy::dotenv;

use crate::leave::policy::{DEFAULT_ANNUAL_ALLOWANCE, LeavePolicy};
use crate::model::role::RequesterRole;

#[derive(Clone)]
pub struct Config {
    pub database_url: String,
    pub jwt_secret: String,
    pub server_addr: String,
    pub access_token_ttl: usize,
    pub refresh_token_ttl: usize,

    // Rate limiting
    pub rate_login_per_min: u32,
    pub rate_refresh_per_min: u32,
    pub rate_protected_per_min: u32,

    pub api_prefix: String,

    pub log_dir: String,
    pub log_level: tracing::Level,

    pub leave_policy: LeavePolicy,
}

fn required(key: &str) -> Result<String> {
    env::var(key).with_context(|| format!("{key} must be set"))
}

fn parse_value<T>(key: &str, raw: &str) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    raw.trim()
        .parse()
        .map_err(|e| anyhow::anyhow!("{key}={raw:?} is invalid: {e}"))
}

fn optional<T>(key: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(key) {
        Ok(raw) => parse_value(key, &raw).map(Some),
        Err(_) => Ok(None),
    }
}

fn or_default<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    Ok(optional(key)?.unwrap_or(default))
}

fn leave_policy() -> Result<LeavePolicy> {
    let mut allowances = HashMap::new();
    for (key, role) in [
        ("LEAVE_ALLOWANCE_TUTOR", RequesterRole::Tutor),
        ("LEAVE_ALLOWANCE_PEON", RequesterRole::Peon),
        ("LEAVE_ALLOWANCE_TECHNICAL", RequesterRole::Technical),
        ("LEAVE_ALLOWANCE_ADMIN_PERSONNEL", RequesterRole::AdminPersonnel),
    ] {
        if let Some(days) = optional::<u32>(key)? {
            allowances.insert(role, days);
        }
    }

    Ok(LeavePolicy {
        default_allowance: or_default("LEAVE_ALLOWANCE_DEFAULT", DEFAULT_ANNUAL_ALLOWANCE)?,
        allowances,
        allow_backdated: or_default("LEAVE_ALLOW_BACKDATED", false)?,
    })
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenv().ok();

        Ok(Self {
            server_addr: required("SERVER_ADDR")?,
            database_url: required("DATABASE_URL")?,
            jwt_secret: required("JWT_SECRET")?,
            access_token_ttl: or_default("ACCESS_TOKEN_TTL", 900)?, // 15 min
            refresh_token_ttl: or_default("REFRESH_TOKEN_TTL", 604_800)?, // 7 days

            rate_login_per_min: or_default("RATE_LOGIN_PER_MIN", 60)?,
            rate_refresh_per_min: or_default("RATE_REFRESH_PER_MIN", 30)?,
            rate_protected_per_min: or_default("RATE_PROTECTED_PER_MIN", 1000)?,

            api_prefix: env::var("API_PREFIX").unwrap_or_else(|_| "/api".to_string()),

            log_dir: env::var("LOG_DIR").unwrap_or_else(|_| "logs".to_string()),
            log_level: or_default("LOG_LEVEL", tracing::Level::DEBUG)?,

            leave_policy: leave_policy()?,
        })
    }
}
