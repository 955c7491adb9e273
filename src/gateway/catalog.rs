//! Static description of the schema both gateways validate against.
//!
//! Mirrors `migrations/`. Anything not listed here is rejected before a
//! statement is built, so identifiers reaching SQL are always known names.

use super::{Embed, GatewayError, Query};

/// Column default applied when an insert omits the column.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ColumnDefault {
    None,
    GeneratedId,
    Now,
    Bool(bool),
    Text(&'static str),
}

#[derive(Debug, Clone, Copy)]
pub struct ColumnDef {
    pub name: &'static str,
    pub nullable: bool,
    pub default: ColumnDefault,
}

const fn nullable(name: &'static str) -> ColumnDef {
    ColumnDef {
        name,
        nullable: true,
        default: ColumnDefault::None,
    }
}

const fn required(name: &'static str) -> ColumnDef {
    ColumnDef {
        name,
        nullable: false,
        default: ColumnDefault::None,
    }
}

const fn defaulted(name: &'static str, default: ColumnDefault) -> ColumnDef {
    ColumnDef {
        name,
        nullable: false,
        default,
    }
}

const ID: ColumnDef = defaulted("id", ColumnDefault::GeneratedId);
const CREATED_AT: ColumnDef = defaulted("created_at", ColumnDefault::Now);
const UPDATED_AT: ColumnDef = defaulted("updated_at", ColumnDefault::Now);

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RelationKind {
    /// Single related row whose `id` equals `column` on this table.
    BelongsTo { column: &'static str },
    /// Related rows whose `foreign_column` equals this table's `id`.
    HasMany { foreign_column: &'static str },
}

#[derive(Debug, Clone, Copy)]
pub struct RelationDef {
    pub name: &'static str,
    pub table: &'static str,
    pub kind: RelationKind,
}

#[derive(Debug)]
pub struct TableDef {
    pub name: &'static str,
    pub columns: &'static [ColumnDef],
    pub unique: &'static [&'static [&'static str]],
    pub relations: &'static [RelationDef],
}

impl TableDef {
    pub fn column(&self, name: &str) -> Option<&ColumnDef> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column(name).is_some()
    }

    pub fn relation(&self, name: &str) -> Option<&RelationDef> {
        self.relations.iter().find(|r| r.name == name)
    }

    pub fn require_column(&self, name: &str) -> Result<&ColumnDef, GatewayError> {
        self.column(name).ok_or_else(|| {
            GatewayError::Rejected(format!("unknown column {}.{name}", self.name))
        })
    }

    pub fn require_relation(&self, name: &str) -> Result<&RelationDef, GatewayError> {
        self.relation(name).ok_or_else(|| {
            GatewayError::Rejected(format!("unknown relation {}.{name}", self.name))
        })
    }
}

pub static TABLES: &[TableDef] = &[
    TableDef {
        name: "profiles",
        columns: &[
            required("id"),
            nullable("full_name"),
            nullable("email"),
            nullable("avatar_url"),
            nullable("headline"),
            nullable("bio"),
            nullable("location"),
            nullable("website"),
            CREATED_AT,
            UPDATED_AT,
        ],
        unique: &[&["id"]],
        relations: &[],
    },
    TableDef {
        name: "user_roles",
        columns: &[
            ID,
            required("user_id"),
            defaulted("role", ColumnDefault::Text("learner")),
            CREATED_AT,
        ],
        unique: &[&["id"], &["user_id", "role"]],
        relations: &[],
    },
    TableDef {
        name: "skills",
        columns: &[
            ID,
            required("name"),
            nullable("category"),
            nullable("icon"),
            CREATED_AT,
        ],
        unique: &[&["id"], &["name"]],
        relations: &[],
    },
    TableDef {
        name: "jobs",
        columns: &[
            ID,
            nullable("employer_id"),
            required("title"),
            required("description"),
            nullable("company_name"),
            nullable("company_logo"),
            nullable("budget_min"),
            nullable("budget_max"),
            nullable("duration_days"),
            nullable("category"),
            defaulted("status", ColumnDefault::Text("open")),
            defaulted("is_verified", ColumnDefault::Bool(false)),
            CREATED_AT,
            UPDATED_AT,
        ],
        unique: &[&["id"]],
        relations: &[
            RelationDef {
                name: "applications",
                table: "applications",
                kind: RelationKind::HasMany {
                    foreign_column: "job_id",
                },
            },
            RelationDef {
                name: "job_skills",
                table: "job_skills",
                kind: RelationKind::HasMany {
                    foreign_column: "job_id",
                },
            },
        ],
    },
    TableDef {
        name: "job_skills",
        columns: &[ID, required("job_id"), required("skill_id")],
        unique: &[&["id"], &["job_id", "skill_id"]],
        relations: &[
            RelationDef {
                name: "skills",
                table: "skills",
                kind: RelationKind::BelongsTo { column: "skill_id" },
            },
            RelationDef {
                name: "jobs",
                table: "jobs",
                kind: RelationKind::BelongsTo { column: "job_id" },
            },
        ],
    },
    TableDef {
        name: "applications",
        columns: &[
            ID,
            required("job_id"),
            required("applicant_id"),
            defaulted("status", ColumnDefault::Text("pending")),
            nullable("cover_letter"),
            nullable("proposed_budget"),
            CREATED_AT,
            UPDATED_AT,
        ],
        unique: &[&["id"], &["job_id", "applicant_id"]],
        relations: &[RelationDef {
            name: "jobs",
            table: "jobs",
            kind: RelationKind::BelongsTo { column: "job_id" },
        }],
    },
    TableDef {
        name: "learning_paths",
        columns: &[
            ID,
            required("title"),
            nullable("description"),
            nullable("image_url"),
            nullable("difficulty"),
            nullable("category"),
            nullable("duration_hours"),
            defaulted("is_published", ColumnDefault::Bool(false)),
            CREATED_AT,
            UPDATED_AT,
        ],
        unique: &[&["id"]],
        relations: &[RelationDef {
            name: "lessons",
            table: "lessons",
            kind: RelationKind::HasMany {
                foreign_column: "learning_path_id",
            },
        }],
    },
    TableDef {
        name: "lessons",
        columns: &[
            ID,
            required("learning_path_id"),
            required("title"),
            nullable("description"),
            nullable("content"),
            nullable("video_url"),
            nullable("duration_minutes"),
            required("order_index"),
            CREATED_AT,
            UPDATED_AT,
        ],
        unique: &[&["id"]],
        relations: &[RelationDef {
            name: "learning_paths",
            table: "learning_paths",
            kind: RelationKind::BelongsTo {
                column: "learning_path_id",
            },
        }],
    },
    TableDef {
        name: "user_progress",
        columns: &[
            ID,
            required("user_id"),
            required("learning_path_id"),
            nullable("lesson_id"),
            defaulted("completed", ColumnDefault::Bool(false)),
            nullable("completed_at"),
            CREATED_AT,
        ],
        unique: &[&["id"], &["user_id", "lesson_id"]],
        relations: &[
            RelationDef {
                name: "learning_paths",
                table: "learning_paths",
                kind: RelationKind::BelongsTo {
                    column: "learning_path_id",
                },
            },
            RelationDef {
                name: "lessons",
                table: "lessons",
                kind: RelationKind::BelongsTo { column: "lesson_id" },
            },
        ],
    },
    TableDef {
        name: "payments",
        columns: &[
            ID,
            nullable("payer_id"),
            nullable("payee_id"),
            nullable("job_id"),
            required("amount"),
            defaulted("currency", ColumnDefault::Text("usd")),
            defaulted("status", ColumnDefault::Text("pending")),
            nullable("stripe_payment_id"),
            nullable("completed_at"),
            CREATED_AT,
        ],
        unique: &[&["id"]],
        relations: &[],
    },
    TableDef {
        name: "course_likes",
        columns: &[ID, required("learning_path_id"), required("user_id"), CREATED_AT],
        unique: &[&["id"], &["learning_path_id", "user_id"]],
        relations: &[],
    },
    TableDef {
        name: "course_reviews",
        columns: &[
            ID,
            required("learning_path_id"),
            required("user_id"),
            required("rating"),
            nullable("comment"),
            CREATED_AT,
            UPDATED_AT,
        ],
        unique: &[&["id"], &["learning_path_id", "user_id"]],
        relations: &[],
    },
];

/// Look up a table by name, failing closed on unknown names.
pub fn table(name: &str) -> Result<&'static TableDef, GatewayError> {
    TABLES
        .iter()
        .find(|t| t.name == name)
        .ok_or_else(|| GatewayError::Rejected(format!("unknown table {name}")))
}

/// Validate every identifier a query references.
pub fn validate_query(query: &Query) -> Result<&'static TableDef, GatewayError> {
    let def = table(&query.table)?;
    for column in &query.columns {
        def.require_column(column)?;
    }
    for filter in &query.filters {
        def.require_column(filter.column())?;
    }
    if let Some(order) = &query.order {
        def.require_column(&order.column)?;
    }
    if let Some(limit) = query.limit {
        if limit < 0 {
            return Err(GatewayError::Rejected(format!(
                "negative limit {limit} on {}",
                query.table
            )));
        }
    }
    validate_embeds(def, &query.embeds)?;
    Ok(def)
}

fn validate_embeds(parent: &TableDef, embeds: &[Embed]) -> Result<(), GatewayError> {
    for embed in embeds {
        let relation = parent.require_relation(&embed.relation)?;
        let target = table(relation.table)?;
        for column in &embed.columns {
            target.require_column(column)?;
        }
        validate_embeds(target, &embed.embeds)?;
    }
    Ok(())
}

/// Validate the columns of a write against a table.
pub fn validate_columns<'a>(
    def: &TableDef,
    columns: impl IntoIterator<Item = &'a str>,
) -> Result<(), GatewayError> {
    for column in columns {
        def.require_column(column)?;
    }
    Ok(())
}
