//! Field registries and per-endpoint listing policies.
//!
//! Expressions reference the aliases set up by the base queries in
//! `infra::storage`: `sp` system_platform, `am` advisory_metadata,
//! `at` advisory_type, `aad` advisory_account_data, `pn` package_name,
//! `pad` package_account_data.

use std::sync::Arc;

use listing_core::{
    FieldDescriptor, FieldKind, FilterOperator, LimitCfg, ListOpts, Registry, RegistryError,
};

use crate::config::InventoryConfig;

pub fn system_registry() -> Result<Registry, RegistryError> {
    Registry::builder("system", "id")
        .field(FieldDescriptor::column("id", "sp.inventory_id", FieldKind::String))
        .field(FieldDescriptor::column("display_name", "sp.display_name", FieldKind::String))
        .field(FieldDescriptor::column(
            "last_evaluation",
            "sp.last_evaluation",
            FieldKind::DateTimeUtc,
        ))
        .field(FieldDescriptor::column("last_upload", "sp.last_upload", FieldKind::DateTimeUtc))
        .field(FieldDescriptor::column(
            "rhsa_count",
            "sp.advisory_sec_count_cache",
            FieldKind::I64,
        ))
        .field(FieldDescriptor::column(
            "rhba_count",
            "sp.advisory_bug_count_cache",
            FieldKind::I64,
        ))
        .field(FieldDescriptor::column(
            "rhea_count",
            "sp.advisory_enh_count_cache",
            FieldKind::I64,
        ))
        .field(FieldDescriptor::column(
            "packages_installed",
            "sp.packages_installed",
            FieldKind::I64,
        ))
        .field(FieldDescriptor::column(
            "packages_updatable",
            "sp.packages_updatable",
            FieldKind::I64,
        ))
        .field(FieldDescriptor::column("enabled", "NOT sp.opt_out", FieldKind::Bool))
        .field(FieldDescriptor::column("stale", "sp.stale", FieldKind::Bool))
        .field(FieldDescriptor::filter_only(
            "system_profile.sap_system",
            "sp.system_profile ->> 'sap_system'",
            FieldKind::String,
        ))
        .field(FieldDescriptor::filter_only(
            "system_profile.ansible.controller_version",
            "sp.system_profile -> 'ansible' ->> 'controller_version'",
            FieldKind::String,
        ))
        .field(FieldDescriptor::filter_only(
            "system_profile.mssql.version",
            "sp.system_profile -> 'mssql' ->> 'version'",
            FieldKind::String,
        ))
        .field(FieldDescriptor::tags("tags"))
        .build()
}

pub fn advisory_registry() -> Result<Registry, RegistryError> {
    Registry::builder("advisory", "id")
        .field(FieldDescriptor::column("id", "am.name", FieldKind::String))
        .field(FieldDescriptor::column("synopsis", "am.synopsis", FieldKind::String))
        .field(
            FieldDescriptor::column("description", "am.description", FieldKind::String)
                .not_sortable(),
        )
        .field(
            FieldDescriptor::column("advisory_type", "at.name", FieldKind::String)
                .with_default("'unknown'"),
        )
        .field(FieldDescriptor::column("public_date", "am.public_date", FieldKind::DateTimeUtc))
        .field(FieldDescriptor::column("severity", "am.severity_id", FieldKind::I64))
        .field(FieldDescriptor::column("cvss_score", "am.cvss_score", FieldKind::F64))
        .field(
            FieldDescriptor::column(
                "applicable_systems",
                "aad.systems_affected",
                FieldKind::I64,
            )
            .with_default("0"),
        )
        .build()
}

pub fn package_registry() -> Result<Registry, RegistryError> {
    Registry::builder("package", "name")
        .field(FieldDescriptor::column("name", "pn.name", FieldKind::String))
        .field(FieldDescriptor::column("summary", "pn.summary", FieldKind::String).not_sortable())
        .field(
            FieldDescriptor::column("systems_installed", "pad.systems_installed", FieldKind::I64)
                .with_default("0"),
        )
        .field(
            FieldDescriptor::column("systems_updatable", "pad.systems_updatable", FieldKind::I64)
                .with_default("0"),
        )
        .build()
}

/// Listing policy for every inventory endpoint, built once at startup.
#[derive(Clone, Debug)]
pub struct Catalog {
    pub systems: ListOpts,
    pub systems_export: ListOpts,
    pub advisory_systems: ListOpts,
    pub advisory_systems_export: ListOpts,
    pub advisories: ListOpts,
    pub advisories_export: ListOpts,
    pub packages: ListOpts,
    pub packages_export: ListOpts,
}

impl Catalog {
    pub fn new(cfg: &InventoryConfig) -> Result<Self, RegistryError> {
        let limits = LimitCfg {
            default: cfg.default_limit,
            max: cfg.max_limit,
        };
        let paged = |registry: &Arc<Registry>| {
            ListOpts::new(registry.clone())
                .limits(limits)
                .allow_unbounded(cfg.allow_unbounded_list)
        };

        let system = Arc::new(system_registry()?);
        let advisory = Arc::new(advisory_registry()?);
        let package = Arc::new(package_registry()?);

        let systems = |opts: ListOpts| {
            opts.default_filter("stale", FilterOperator::Eq, &["false"])
                .search("display_name")
                .with_tags()
        };

        Ok(Self {
            systems: systems(paged(&system)).default_sort("-last_upload").build()?,
            systems_export: systems(ListOpts::new(system.clone())).build()?,
            advisory_systems: systems(paged(&system))
                .default_sort("-last_upload")
                .build()?,
            advisory_systems_export: systems(ListOpts::new(system)).build()?,
            advisories: paged(&advisory)
                .search("synopsis")
                .default_sort("-public_date")
                .build()?,
            advisories_export: ListOpts::new(advisory).search("synopsis").build()?,
            packages: paged(&package).search("name").build()?,
            packages_export: ListOpts::new(package).search("name").build()?,
        })
    }
}
