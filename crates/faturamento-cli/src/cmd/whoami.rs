//! `fat whoami`: the signed-in identity and its role.

use crate::context::CliContext;
use crate::output::{OutputMode, pretty_kv, render};
use faturamento_core::access::Role;
use serde::Serialize;
use std::io::{self, Write};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WhoAmI {
    pub email: String,
    pub display_name: String,
    pub role: Role,
}

/// Execute `fat whoami`.
///
/// # Errors
///
/// Missing identity, or an e-mail outside the allowed domains.
pub fn run_whoami(ctx: &CliContext) -> anyhow::Result<()> {
    let session = ctx.session()?;
    let me = WhoAmI {
        role: session.role,
        email: session.principal.email,
        display_name: session.principal.display_name,
    };
    render(ctx.output, &me, write_me)
}

fn write_me(me: &WhoAmI, mode: OutputMode, w: &mut dyn Write) -> io::Result<()> {
    let role = match me.role {
        Role::Admin => "admin",
        Role::User => "user",
    };
    if mode == OutputMode::Text {
        return writeln!(w, "{}\t{}\t{role}", me.email, me.display_name);
    }
    pretty_kv(w, "E-mail", &me.email)?;
    pretty_kv(w, "Nome", &me.display_name)?;
    pretty_kv(w, "Perfil", role)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_serializes_lowercase() {
        let me = WhoAmI {
            email: "chefe@maida.health".into(),
            display_name: "Chefe".into(),
            role: Role::Admin,
        };
        let json = serde_json::to_value(&me).unwrap();
        assert_eq!(json["role"], "admin");
        assert_eq!(json["displayName"], "Chefe");
    }
}
