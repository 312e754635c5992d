use std::collections::BTreeMap;

use clap::Args;

use crate::op::SessionOpError;

fn parse_meta(s: &str) -> Result<(String, String), String> {
    let (key, value) = s
        .split_once('=')
        .ok_or_else(|| format!("invalid meta entry '{s}', expected key=value"))?;
    if key.is_empty() {
        return Err(format!("invalid meta entry '{s}', empty key"));
    }
    Ok((key.to_string(), value.to_string()))
}

/// Encrypt and store a new secret (super admin only)
#[derive(Args, Debug, Clone)]
pub struct Create {
    pub title: String,

    /// The secret itself, e.g. the password
    #[arg(long, env = "TVAULT_SECRET_VALUE", hide_env_values = true)]
    pub value: String,

    #[arg(long)]
    pub website: Option<String>,

    /// Login name stored next to the secret
    #[arg(long)]
    pub login: Option<String>,

    /// Extra unencrypted attributes as key=value
    #[arg(long = "meta", value_parser = parse_meta)]
    pub meta: Vec<(String, String)>,

    /// Teams whose admins can see this secret
    #[arg(long = "team")]
    pub teams: Vec<String>,
}

impl Create {
    fn meta(&self) -> BTreeMap<String, String> {
        let mut meta: BTreeMap<String, String> = self.meta.iter().cloned().collect();
        if let Some(website) = &self.website {
            meta.insert("website".to_string(), website.clone());
        }
        if let Some(login) = &self.login {
            meta.insert("email".to_string(), login.clone());
        }
        meta
    }
}

#[async_trait::async_trait]
impl crate::op::Op for Create {
    type Error = SessionOpError;
    type Output = String;

    async fn execute(&self, ctx: &crate::op::OpContext) -> Result<Self::Output, Self::Error> {
        let (_, vault, session) = ctx.session().await?;
        let record = vault
            .create_secret(
                &session,
                &self.title,
                self.meta(),
                self.value.as_bytes(),
                self.teams.clone(),
            )
            .await?;
        Ok(format!("Created secret {} (id: {})", record.title(), record.id()))
    }
}
