use std::collections::HashMap;

use zbus::zvariant::{self, OwnedValue};
use zbus_macros::proxy;

/// Interface bag as carried by ObjectManager payloads: interface name to
/// property name to value.
pub(crate) type InterfaceProperties = HashMap<String, HashMap<String, OwnedValue>>;

#[proxy(
    default_service = "org.freedesktop.UDisks2",
    default_path = "/org/freedesktop/UDisks2",
    interface = "org.freedesktop.DBus.ObjectManager"
)]
pub(crate) trait UDisks2ObjectManager {
    fn get_managed_objects(
        &self,
    ) -> zbus::Result<HashMap<zvariant::OwnedObjectPath, InterfaceProperties>>;

    #[zbus(signal)]
    fn interfaces_added(
        &self,
        object_path: zvariant::OwnedObjectPath,
        interfaces_and_properties: InterfaceProperties,
    ) -> zbus::Result<()>;

    #[zbus(signal)]
    fn interfaces_removed(
        &self,
        object_path: zvariant::OwnedObjectPath,
        interfaces: Vec<String>,
    ) -> zbus::Result<()>;
}
