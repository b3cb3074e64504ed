//! Device triggers
//!
//! Dispatches device trigger configs to the trigger platform of the
//! integration named in their `domain`.

use tracing::{debug, warn};

use crate::config::TriggerConfig;
use crate::context::DeviceAutomationContext;
use crate::error::{DeviceAutomationError, DeviceAutomationResult, InvalidDeviceAutomationConfig};
use crate::platform::{DetachHandle, TriggerAction, TriggerCapabilities, TriggerInfo};

/// Validate a device trigger config.
///
/// Platforms without a dynamic validator only get their static schema
/// applied. Otherwise the config entry of the device that belongs to the
/// trigger's domain must exist; once its integration is loaded the platform
/// validates the config. If the entry will not be loaded, the config is
/// returned unvalidated so automations referencing it still set up.
///
/// Invalid device automation configs surface as
/// [`DeviceAutomationError::Invalid`].
pub async fn validate_trigger_config(
    ctx: &DeviceAutomationContext,
    config: TriggerConfig,
) -> DeviceAutomationResult<TriggerConfig> {
    validate_with_platform(ctx, config)
        .await
        .map_err(DeviceAutomationError::into_validation_error)
}

async fn validate_with_platform(
    ctx: &DeviceAutomationContext,
    config: TriggerConfig,
) -> DeviceAutomationResult<TriggerConfig> {
    let domain = config.domain()?.to_string();
    let platform = ctx.platforms.get_trigger_platform(&domain)?;
    debug!(
        domain = %domain,
        dynamic = platform.config_validator().is_some(),
        "Resolved device trigger platform"
    );

    let Some(validator) = platform.config_validator() else {
        return platform.trigger_schema().validate(config);
    };

    let device = ctx
        .devices
        .get(config.device_id()?)
        .ok_or_else(InvalidDeviceAutomationConfig::default)?;

    let entry = device
        .config_entries
        .iter()
        .filter_map(|entry_id| ctx.config_entries.get(entry_id))
        .find(|entry| entry.domain == domain)
        .ok_or_else(InvalidDeviceAutomationConfig::default)?;

    debug!(
        domain = %domain,
        device_id = %device.id,
        entry_id = %entry.entry_id,
        "Waiting for config entry before validating device trigger"
    );

    if !ctx.config_entries.wait_component(&entry).await {
        debug!(
            domain = %domain,
            entry_id = %entry.entry_id,
            "Config entry not loaded, skipping device trigger validation"
        );
        return Ok(config);
    }

    validator.validate_trigger_config(ctx, config).await
}

/// Attach a validated device trigger.
///
/// The platform is resolved on every call; `action` and `trigger_info` are
/// handed to it as they are and its detach handle is returned.
pub async fn attach_trigger(
    ctx: &DeviceAutomationContext,
    config: TriggerConfig,
    action: TriggerAction,
    trigger_info: TriggerInfo,
) -> DeviceAutomationResult<DetachHandle> {
    let platform = ctx.platforms.get_trigger_platform(config.domain()?)?;
    platform
        .attach_trigger(ctx, config, action, trigger_info)
        .await
}

/// Extra fields a trigger accepts.
///
/// Unknown integrations, integrations without trigger support and configs
/// the platform rejects yield empty capabilities.
pub async fn get_trigger_capabilities(
    ctx: &DeviceAutomationContext,
    config: &TriggerConfig,
) -> DeviceAutomationResult<TriggerCapabilities> {
    let resolved = config
        .domain()
        .and_then(|domain| ctx.platforms.get_trigger_platform(domain));
    let platform = match resolved {
        Ok(platform) => platform,
        Err(DeviceAutomationError::InvalidConfig(err)) => {
            debug!("No trigger capabilities: {}", err);
            return Ok(TriggerCapabilities::default());
        }
        Err(err) => return Err(err),
    };

    match platform.get_trigger_capabilities(ctx, config).await {
        Err(DeviceAutomationError::InvalidConfig(_)) => Ok(TriggerCapabilities::default()),
        result => result,
    }
}

/// List the triggers offered for a device by all of its integrations.
///
/// Domains are visited in the order of the device's config entries. Domains
/// without a trigger platform are skipped; a platform that fails to list its
/// triggers is logged and skipped.
pub async fn get_device_triggers(
    ctx: &DeviceAutomationContext,
    device_id: &str,
) -> DeviceAutomationResult<Vec<TriggerConfig>> {
    let device = ctx.devices.get(device_id).ok_or_else(|| {
        InvalidDeviceAutomationConfig::new(format!("Device {} not found", device_id))
    })?;

    let mut domains: Vec<String> = Vec::new();
    for entry in device
        .config_entries
        .iter()
        .filter_map(|entry_id| ctx.config_entries.get(entry_id))
    {
        if !domains.contains(&entry.domain) {
            domains.push(entry.domain);
        }
    }

    let mut triggers = Vec::new();
    for domain in domains {
        let platform = match ctx.platforms.get_trigger_platform(&domain) {
            Ok(platform) => platform,
            Err(err) => {
                debug!(domain = %domain, "Skipping domain: {}", err);
                continue;
            }
        };

        match platform.get_triggers(ctx, device_id).await {
            Ok(found) => triggers.extend(found),
            Err(err) => warn!(
                domain = %domain,
                device_id,
                "Unexpected error fetching device triggers: {}",
                err
            ),
        }
    }

    Ok(triggers)
}
