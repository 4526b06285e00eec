use std::{error::Error, sync::Arc};

use tracing_subscriber::EnvFilter;
use wrapp_services::{
    Arguments, AsyncInitialize, Config, ConfigOverrides, DynError, FnFactory, ParameterInfo,
    ServiceDescriptor, ServiceProviderBuilder,
};

fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug")),
        )
        .init();

    let provider = ServiceProviderBuilder::new()
        .add_service(
            ServiceDescriptor::new("settings", "settings"),
            FnFactory::new(
                vec![ParameterInfo::with_default("region")],
                |args: &Arguments| {
                    let region: Option<Config<String>> = args.resolve("region")?;
                    Ok::<_, DynError>(Settings {
                        region: region.map_or_else(|| "local".to_string(), |r| (*r).clone()),
                    })
                },
            ),
        )
        .add_descriptor(
            ServiceDescriptor::new("catalog", "catalog")
                .depends_on("settings")
                .requires_init(true),
        )
        .add_factory_with_async_init(
            "catalog",
            FnFactory::new(vec![ParameterInfo::required("settings")], |args: &Arguments| {
                Ok::<_, DynError>(Catalog {
                    settings: args.resolve("settings")?,
                })
            }),
        )
        .build()?;

    let mut overrides = ConfigOverrides::new();
    overrides.add_config("region", "eu-west".to_string())?;

    let catalog = futures::executor::block_on(provider.require::<Catalog>(
        "catalog",
        "demo",
        Some(&overrides),
    ))?;

    println!("catalog ready for region {}", catalog.settings.region);
    println!("{:?}", provider);
    println!("{:?}", provider.get_cache_statistics());
    Ok(())
}

#[derive(Debug)]
struct Settings {
    region: String,
}

#[derive(Debug)]
struct Catalog {
    settings: Arc<Settings>,
}
impl AsyncInitialize for Catalog {
    async fn initialize(&self) -> Result<(), DynError> {
        tracing::info!("Loading catalog for {}", self.settings.region);
        Ok(())
    }
}
