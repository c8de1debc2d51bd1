use anyhow::{anyhow, bail, Error};

use crate::args::RolesAction;
use crate::models::RoleTemplate;
use crate::repos::roles::RoleRepository;

pub fn run(roles: &RoleRepository, action: &RolesAction) -> Result<(), Error> {
    match action {
        RolesAction::List => {
            for role in roles.list()? {
                let marker = if role.builtin { "" } else { " (custom)" };
                println!("{:<20} {:<24} {}{}", role.id, role.name, role.category, marker);
            }
        }
        RolesAction::Show { id } => {
            let role = roles
                .find(id)?
                .ok_or_else(|| anyhow!("Unknown role: {}", id))?;
            println!(
                "{} [{}]\nCategory: {}\n{}\n\n{}",
                role.name, role.id, role.category, role.description, role.instructions
            );
        }
        RolesAction::Add {
            name,
            category,
            instructions,
            description,
        } => {
            if name.trim().is_empty() || instructions.trim().is_empty() {
                bail!("Role name and instructions must not be empty");
            }
            let mut role = RoleTemplate::new(name.trim(), category.trim(), instructions.trim());
            if let Some(description) = description {
                role = role.with_description(description);
            }
            if !roles.add(&role)? {
                bail!("A role named `{}` already exists", name.trim());
            }
            println!("Added role {} ({})", role.name, role.id);
        }
        RolesAction::Remove { id } => {
            if let Some(role) = roles.find(id)?.filter(|r| r.builtin) {
                bail!("`{}` is a built-in role and cannot be removed", role.name);
            }
            if !roles.remove(id)? {
                bail!("Unknown role: {}", id);
            }
            println!("Removed role {}", id);
        }
    }
    Ok(())
}
