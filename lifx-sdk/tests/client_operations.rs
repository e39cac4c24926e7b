//! LifxLan client operations against a simulated network
//!
//! These tests validate:
//! - Discovery and the light/feature filters
//! - Lookup by label, group and location, including the rediscovery retry
//! - Broadcast getters mapping replies onto known lights
//! - Acknowledged and rapid broadcast setters
//! - Group fan-out

mod helpers;

use std::collections::HashSet;
use std::time::Duration;

use helpers::{client_on, red, sends_of};
use lifx_exchange::testing::{SimulatedDevice, SimulatedNetwork};
use lifx_exchange::ExchangeError;
use lifx_protocol::MessageType;
use lifx_sdk::{
    Device, ExchangeConfig, HardwareAddress, Hsbk, LifxLan, Power, SdkError, Waveform,
    WaveformEffect,
};
use rstest::rstest;

fn macs(devices: &[Device]) -> HashSet<HardwareAddress> {
    devices.iter().map(Device::mac).collect()
}

fn mixed_network() -> SimulatedNetwork {
    SimulatedNetwork::with_devices([
        SimulatedDevice::light(1).with_product(27),
        SimulatedDevice::light(2).with_product(32),
        SimulatedDevice::light(3).with_product(55),
        SimulatedDevice::light(4).with_product(29),
        SimulatedDevice::light(5).with_product(50),
        SimulatedDevice::light(6).with_product(9999),
    ])
}

#[test]
fn test_discover_fills_devices_and_lights() {
    let network = mixed_network();
    let lifx = client_on(&network);
    assert!(lifx.devices().is_empty());

    let found = lifx.discover().unwrap();
    assert_eq!(found.len(), 6);
    assert_eq!(lifx.devices().len(), 6);
    assert_eq!(lifx.lights().len(), 5);
    assert!(!lifx
        .lights()
        .iter()
        .any(|d| d.mac() == SimulatedDevice::light(6).mac));
}

#[rstest]
#[case::multizone(LifxLan::get_multizone_lights, &[2])]
#[case::chain(LifxLan::get_chain_lights, &[3])]
#[case::infrared(LifxLan::get_infrared_lights, &[4])]
#[case::color(LifxLan::get_color_lights, &[1, 2, 3, 4])]
fn test_feature_filters(
    #[case] filter: fn(&LifxLan) -> lifx_sdk::Result<Vec<Device>>,
    #[case] expected: &[u8],
) {
    let network = mixed_network();
    let lifx = client_on(&network);

    // Filters discover on their own when nothing is known yet
    let lights = filter(&lifx).unwrap();
    let expected: HashSet<_> = expected
        .iter()
        .map(|&n| SimulatedDevice::light(n).mac)
        .collect();
    assert_eq!(macs(&lights), expected);
}

#[test]
fn test_discovered_devices_need_no_version_query_for_filters() {
    let network = mixed_network();
    let lifx = client_on(&network);
    lifx.discover().unwrap();
    network.reset_stats();

    lifx.get_color_lights().unwrap();
    assert_eq!(sends_of(&network, MessageType::GetVersion), 0);
}

#[test]
fn test_device_by_name() {
    let network = SimulatedNetwork::with_devices([
        SimulatedDevice::light(1).with_label("Desk"),
        SimulatedDevice::light(2).with_label("Porch"),
    ]);
    let lifx = client_on(&network);

    let porch = lifx.get_device_by_name("Porch").unwrap();
    assert_eq!(porch.mac(), SimulatedDevice::light(2).mac);
    assert_eq!(porch.label().unwrap().value, "Porch");
}

#[test]
fn test_device_by_name_rediscovers_once() {
    let network = SimulatedNetwork::with_devices([SimulatedDevice::light(1)]);
    let lifx = client_on(&network);
    lifx.discover().unwrap();

    network.add_device(SimulatedDevice::light(2).with_label("Garage"));
    let garage = lifx.get_device_by_name("Garage").unwrap();
    assert_eq!(garage.mac(), SimulatedDevice::light(2).mac);
    assert_eq!(lifx.devices().len(), 2);
}

#[test]
fn test_missing_name_is_not_found() {
    let network = SimulatedNetwork::with_devices([SimulatedDevice::light(1)]);
    let lifx = client_on(&network);

    let err = lifx.get_device_by_name("Attic").unwrap_err();
    assert!(matches!(err, SdkError::DeviceNotFound(name) if name == "Attic"));
    assert_eq!(sends_of(&network, MessageType::GetService), 2);
}

#[test]
fn test_devices_by_names_forms_a_group() {
    let network = SimulatedNetwork::with_devices((1..=4).map(SimulatedDevice::light));
    let lifx = client_on(&network);

    let group = lifx.get_devices_by_names(&["Light 1", "Light 3"]).unwrap();
    let expected: HashSet<_> = [SimulatedDevice::light(1).mac, SimulatedDevice::light(3).mac]
        .into_iter()
        .collect();
    assert_eq!(macs(group.devices()), expected);
    // Everything was found on the first pass
    assert_eq!(sends_of(&network, MessageType::GetService), 1);
}

#[test]
fn test_devices_by_group_and_location() {
    let network = SimulatedNetwork::with_devices([
        SimulatedDevice::light(1).with_group("Kitchen"),
        SimulatedDevice::light(2).with_group("Kitchen").with_location("Cabin"),
        SimulatedDevice::light(3),
        SimulatedDevice::light(4).with_location("Cabin"),
    ]);
    let lifx = client_on(&network);

    let kitchen = lifx.get_devices_by_group("Kitchen").unwrap();
    assert_eq!(kitchen.len(), 2);
    assert!(kitchen.contains(SimulatedDevice::light(1).mac));
    assert!(kitchen.contains(SimulatedDevice::light(2).mac));

    let cabin = lifx.get_devices_by_location("Cabin").unwrap();
    assert_eq!(cabin.len(), 2);
    assert!(cabin.contains(SimulatedDevice::light(2).mac));
    assert!(cabin.contains(SimulatedDevice::light(4).mac));

    assert!(lifx.get_devices_by_group("Garage").unwrap().is_empty());
}

#[test]
fn test_power_all_lights_maps_replies_by_address() {
    let network = SimulatedNetwork::with_devices([
        SimulatedDevice::light(1).with_power(65535),
        SimulatedDevice::light(2),
        SimulatedDevice::light(3).with_product(9999),
    ]);
    let lifx = client_on(&network);

    let powers = lifx.get_power_all_lights().unwrap();
    assert_eq!(powers.len(), 2);
    for (light, power) in powers {
        let expected = if light.mac() == SimulatedDevice::light(1).mac {
            Power::On
        } else {
            Power::Off
        };
        assert_eq!(power, expected);
    }
}

#[test]
fn test_set_power_all_lights() {
    let network = SimulatedNetwork::with_devices((1..=3).map(SimulatedDevice::light));
    let lifx = client_on(&network);

    lifx.set_power_all_lights(Power::On, Duration::from_millis(200), false)
        .unwrap();
    for n in 1..=3 {
        assert_eq!(network.device(SimulatedDevice::light(n).mac).unwrap().power, 65535);
    }
    assert!(network.sent().iter().all(|d| d.message.ack_required));
}

#[test]
fn test_rapid_set_power_all_lights_sends_once() {
    let network = SimulatedNetwork::with_devices((1..=3).map(SimulatedDevice::light));
    let lifx = client_on(&network);

    lifx.set_power_all_lights(Power::On, Duration::ZERO, true).unwrap();
    let stats = network.stats();
    assert_eq!(stats.sends, 1);
    assert_eq!(stats.receives, 0);
    assert_eq!(network.device(SimulatedDevice::light(2).mac).unwrap().power, 65535);
}

#[test]
fn test_color_all_lights() {
    let network = SimulatedNetwork::with_devices((1..=2).map(SimulatedDevice::light));
    let lifx = client_on(&network);
    lifx.discover().unwrap();

    lifx.set_color_all_lights(red(), Duration::ZERO, false).unwrap();
    let colors = lifx.get_color_all_lights().unwrap();
    assert_eq!(colors.len(), 2);
    assert!(colors.iter().all(|(_, color)| *color == red()));
}

#[test]
fn test_out_of_range_color_all_lights_is_rejected_before_traffic() {
    let network = SimulatedNetwork::with_devices((1..=2).map(SimulatedDevice::light));
    let lifx = client_on(&network);

    for color in [Hsbk::default(), Hsbk { kelvin: 0, ..red() }] {
        for rapid in [false, true] {
            assert!(matches!(
                lifx.set_color_all_lights(color, Duration::ZERO, rapid),
                Err(SdkError::Protocol(_))
            ));
        }
        let effect = WaveformEffect::new(color, Waveform::Saw);
        assert!(lifx.set_waveform_all_lights(&effect, true).is_err());
    }
    assert_eq!(network.stats().opened, 0);
}

#[test]
fn test_waveform_all_lights() {
    let network = SimulatedNetwork::with_devices((1..=2).map(SimulatedDevice::light));
    let lifx = client_on(&network);

    let effect = WaveformEffect::new(red(), Waveform::Triangle).with_transient(false);
    lifx.set_waveform_all_lights(&effect, true).unwrap();
    assert_eq!(network.device(SimulatedDevice::light(1).mac).unwrap().color, red());
}

#[test]
fn test_rediscovery_keeps_cached_values() {
    let network = SimulatedNetwork::with_devices([SimulatedDevice::light(1)]);
    let lifx = client_on(&network);

    let first = lifx.discover().unwrap().remove(0);
    first.get_label().unwrap();

    lifx.discover().unwrap();
    let again = &lifx.devices()[0];
    assert_eq!(again.label().unwrap().value, "Light 1");
}

#[test]
fn test_group_fan_out_reports_first_error() {
    let network = SimulatedNetwork::with_devices([
        SimulatedDevice::light(1),
        SimulatedDevice::light(2),
    ]);
    let lifx = client_on(&network);
    let group = lifx.get_devices_by_names(&["Light 1", "Light 2"]).unwrap();
    assert_eq!(group.len(), 2);

    network.update_device(SimulatedDevice::light(2).mac, |device| device.silent = true);
    let err = group.set_power(Power::On, false).unwrap_err();
    assert!(err.is_no_response());

    // The responsive member was still switched
    assert_eq!(network.device(SimulatedDevice::light(1).mac).unwrap().power, 65535);
}

#[test]
fn test_group_light_commands() {
    let network = SimulatedNetwork::with_devices((1..=2).map(SimulatedDevice::light));
    let lifx = client_on(&network);
    let group = lifx.get_devices_by_group("Living Room").unwrap();

    group.set_color(red(), Duration::ZERO, false).unwrap();
    group
        .set_light_power(Power::On, Duration::ZERO, false)
        .unwrap();
    for n in 1..=2 {
        let device = network.device(SimulatedDevice::light(n).mac).unwrap();
        assert_eq!(device.color, red());
        assert_eq!(device.power, 65535);
    }
}

#[test]
fn test_invalid_config_is_rejected() {
    let result = LifxLan::with_config(ExchangeConfig::default().with_port(0));
    assert!(matches!(
        result,
        Err(SdkError::Exchange(ExchangeError::InvalidParameter(_)))
    ));
}
