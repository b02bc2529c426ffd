// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result, bail};
use pressroom_app::{Gender, ProfileForm, User, parse_birth_date_input};
use serde::Deserialize;
use std::fs;
use std::path::Path;

/// Fields read from a profile TOML file; absent keys keep the stored value.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProfileEdits {
    pub name: Option<String>,
    pub email: Option<String>,
    pub gender: Option<String>,
    pub cellphone: Option<String>,
    pub birth_date: Option<String>,
    pub address: Option<String>,
    pub number: Option<String>,
}

impl ProfileEdits {
    pub fn load(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("read profile file {}", path.display()))?;
        toml::from_str(&raw).with_context(|| format!("parse profile file {}", path.display()))
    }

    pub fn apply(&self, stored: &User) -> Result<ProfileForm> {
        let mut form = ProfileForm::from_user(stored);
        if let Some(name) = &self.name {
            form.name.clone_from(name);
        }
        if let Some(email) = &self.email {
            form.email.clone_from(email);
        }
        if let Some(gender) = &self.gender {
            let Some(parsed) = Gender::parse(gender) else {
                bail!("gender {gender:?} must be one of: male, female, undefined");
            };
            form.gender = parsed;
        }
        if let Some(cellphone) = &self.cellphone {
            form.cellphone.clone_from(cellphone);
        }
        if let Some(birth_date) = &self.birth_date {
            form.birth_date = parse_birth_date_input(birth_date)?;
        }
        if let Some(address) = &self.address {
            form.address.clone_from(address);
        }
        if let Some(number) = &self.number {
            form.number.clone_from(number);
        }
        Ok(form)
    }
}

#[cfg(test)]
mod tests {
    use super::ProfileEdits;
    use anyhow::Result;
    use pressroom_app::{Gender, User, UserId};

    fn stored() -> User {
        User {
            id: UserId::new("u1"),
            name: "Ana".to_owned(),
            email: "ana@example.com".to_owned(),
            cellphone: "5551234".to_owned(),
            ..User::default()
        }
    }

    #[test]
    fn absent_keys_keep_stored_values() -> Result<()> {
        let edits: ProfileEdits = toml::from_str("name = \"Ana Lima\"\ngender = \"female\"\n")?;
        let form = edits.apply(&stored())?;
        assert_eq!(form.name, "Ana Lima");
        assert_eq!(form.gender, Gender::Female);
        assert_eq!(form.email, "ana@example.com");
        assert_eq!(form.cellphone, "5551234");
        Ok(())
    }

    #[test]
    fn bad_gender_and_date_are_rejected() -> Result<()> {
        let edits: ProfileEdits = toml::from_str("gender = \"other\"\n")?;
        assert!(edits.apply(&stored()).is_err());
        let edits: ProfileEdits = toml::from_str("birth_date = \"yesterday\"\n")?;
        assert!(edits.apply(&stored()).is_err());
        Ok(())
    }

    #[test]
    fn unknown_keys_fail_to_parse() {
        assert!(toml::from_str::<ProfileEdits>("nickname = \"ana\"\n").is_err());
    }

    #[test]
    fn missing_file_names_the_path() {
        let error = ProfileEdits::load(std::path::Path::new("/definitely/profile.toml"))
            .expect_err("missing file");
        assert!(error.to_string().contains("/definitely/profile.toml"));
    }
}
