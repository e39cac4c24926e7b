//! Basic usage of the LIFX SDK
//!
//! Discovers devices, prints what each light reports, then toggles every
//! light off and back on.
//!
//! Run with: LIFX_LOG_MODE=development cargo run -p lifx-sdk --example basic_usage

use std::time::Duration;

use lifx_sdk::logging::init_logging_from_env;
use lifx_sdk::{LifxLan, Power, SdkError};

fn main() -> Result<(), SdkError> {
    if let Err(e) = init_logging_from_env() {
        eprintln!("Logging disabled: {}", e);
    }

    println!("LIFX SDK - Basic Usage");
    println!("======================");

    println!("Discovering LIFX devices...");
    let lifx = LifxLan::new()?;
    let devices = lifx.discover()?;
    if devices.is_empty() {
        println!("No LIFX devices found on the network");
        println!("Make sure the lights are powered on and connected to the same network");
        return Ok(());
    }
    println!("Found {} devices ({} lights)", devices.len(), lifx.lights().len());

    for device in &devices {
        // Reading the label fills the cache used by Display
        match device.get_label() {
            Ok(_) => println!("\n{} [{:?}]", device, device.role()),
            Err(e) => {
                println!("\n{}: {}", device.mac(), e);
                continue;
            }
        }
        if let Ok(Some(name)) = device.get_product_name() {
            println!("  Product:  {}", name);
        }
        if let Ok(group) = device.get_group() {
            println!("  Group:    {}", group);
        }
        if let Ok((_, version)) = device.get_host_firmware_tuple() {
            println!("  Firmware: {}", version);
        }
        if device.is_light() {
            match (device.get_light_power(), device.get_color()) {
                (Ok(power), Ok(color)) => println!(
                    "  Power:    {} (hue {}, saturation {}, brightness {}, {}K)",
                    power, color.hue, color.saturation, color.brightness, color.kelvin
                ),
                (Err(e), _) | (_, Err(e)) => println!("  State:    unavailable ({})", e),
            }
        }
    }

    println!("\nToggling all lights...");
    let before = lifx.get_power_all_lights()?;
    lifx.set_power_all_lights(Power::Off, Duration::from_millis(500), false)?;
    std::thread::sleep(Duration::from_secs(1));
    for (light, power) in before {
        light.set_light_power(power, Duration::from_millis(500), false)?;
    }
    println!("Done");

    Ok(())
}
