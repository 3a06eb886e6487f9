use serde::Deserialize;

/// A GraphQL `Actor`: the `__typename` discriminator plus a login.
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
pub struct Actor {
    #[serde(rename = "__typename", default)]
    pub kind: String,
    #[serde(default)]
    pub login: String,
}

impl Actor {
    /// Returns a REST-compatible login. REST logins for app identities
    /// carry a `[bot]` suffix that GraphQL leaves off.
    pub fn rest_login(&self) -> String {
        if self.kind == "Bot" {
            format!("{}[bot]", self.login)
        } else {
            self.login.clone()
        }
    }
}

/// A git author or committer, optionally linked to a GitHub account.
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
pub struct GitActor {
    #[serde(default)]
    pub user: Option<Actor>,
}

impl GitActor {
    /// Empty when the git identity has no linked account.
    pub fn rest_login(&self) -> String {
        self.user.as_ref().map(Actor::rest_login).unwrap_or_default()
    }
}

/// Login of an optional actor; deleted accounts come back as `null`.
pub fn login_of(actor: Option<&Actor>) -> String {
    actor.map(Actor::rest_login).unwrap_or_default()
}
