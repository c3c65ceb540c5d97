//! Demo accounts. There is no real identity backend: a fixed credential list
//! decides who may log in, and the "session" is a record in the local store.

use anyhow::{bail, Result};
use chrono::{DateTime, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};
use shared::profile::{demo_interests, SkillProfile, StudentProfile, UserRole};
use std::sync::Arc;

use crate::store::{LocalStore, AUTH_KEY, INSIGHTS_KEY, USER_KEY};

const DEMO_CREDENTIALS: [(&str, &str, UserRole); 3] = [
    ("student", "demo", UserRole::Student),
    ("educator", "demo", UserRole::Educator),
    ("admin", "demo", UserRole::Educator),
];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DemoUser {
    pub username: String,
    pub user_type: UserRole,
    pub login_time: DateTime<Utc>,
    pub skills: SkillProfile,
    pub interests: Vec<String>,
    pub learning_style: String,
}

impl DemoUser {
    fn generate<R: Rng + ?Sized>(username: &str, user_type: UserRole, rng: &mut R) -> Self {
        Self {
            username: username.to_string(),
            user_type,
            login_time: Utc::now(),
            skills: SkillProfile::generate_demo(rng),
            interests: demo_interests(rng),
            learning_style: "visual".into(),
        }
    }

    pub fn to_profile(&self) -> StudentProfile {
        StudentProfile {
            name: self.username.clone(),
            kind: self.user_type,
            skills: self.skills.clone(),
            interests: self.interests.clone(),
            learning_style: self.learning_style.clone(),
        }
    }
}

pub struct DemoAuth {
    store: Arc<LocalStore>,
}

impl DemoAuth {
    pub fn new(store: Arc<LocalStore>) -> Self {
        Self { store }
    }

    /// Username, password and role must all match a demo account.
    pub fn login(&self, username: &str, password: &str, role: UserRole) -> Result<DemoUser> {
        let known = DEMO_CREDENTIALS
            .iter()
            .any(|(u, p, r)| *u == username && *p == password && *r == role);
        if !known {
            bail!("Invalid credentials. Try: student/demo or educator/demo");
        }

        let user = DemoUser::generate(username, role, &mut rand::thread_rng());
        self.store.set(USER_KEY, &user)?;
        self.store
            .set(AUTH_KEY, &format!("token_{}", uuid::Uuid::new_v4().simple()))?;
        tracing::info!(username, ?role, "demo login");
        Ok(user)
    }

    /// Forget the user, the auth marker and everything learned about them.
    pub fn logout(&self) -> Result<()> {
        self.store.remove(USER_KEY)?;
        self.store.remove(AUTH_KEY)?;
        self.store.remove(INSIGHTS_KEY)?;
        tracing::info!("demo logout");
        Ok(())
    }

    pub fn current_user(&self) -> Option<DemoUser> {
        if !self.store.contains(AUTH_KEY) {
            return None;
        }
        self.store.get(USER_KEY)
    }

    pub fn is_authenticated(&self) -> bool {
        self.current_user().is_some()
    }

    /// Profile of the logged-in user, or a freshly generated guest.
    pub fn profile(&self) -> StudentProfile {
        self.current_user()
            .map(|u| u.to_profile())
            .unwrap_or_else(|| StudentProfile::guest(&mut rand::thread_rng()))
    }
}
