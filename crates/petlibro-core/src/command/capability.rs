// Static per-class capability tables.

use super::ActionKind;
use crate::model::DeviceClass;

const FEEDER: &[ActionKind] = &[
    ActionKind::DispenseNow,
    ActionKind::SetFeedingPlan,
    ActionKind::SetChildLock,
    ActionKind::SetLight,
    ActionKind::SetSound,
    ActionKind::SetVolume,
    ActionKind::SetDesiccantCycle,
    ActionKind::ResetDesiccant,
];

const CAMERA_FEEDER: &[ActionKind] = &[
    ActionKind::DispenseNow,
    ActionKind::SetFeedingPlan,
    ActionKind::SetChildLock,
    ActionKind::SetLight,
    ActionKind::SetSound,
    ActionKind::SetVolume,
    ActionKind::SetLidCloseTime,
    ActionKind::SetDesiccantCycle,
    ActionKind::ResetDesiccant,
    ActionKind::SetVideoRecord,
];

const RFID_FEEDER: &[ActionKind] = &[
    ActionKind::DispenseNow,
    ActionKind::SetFeedingPlan,
    ActionKind::SetChildLock,
    ActionKind::SetLight,
    ActionKind::SetSound,
    ActionKind::SetVolume,
    ActionKind::SetLidCloseTime,
    ActionKind::SetDesiccantCycle,
    ActionKind::ResetDesiccant,
];

const FOUNTAIN: &[ActionKind] = &[
    ActionKind::SetLight,
    ActionKind::SetSound,
    ActionKind::SetWaterMode,
    ActionKind::SetWaterInterval,
    ActionKind::SetWaterDuration,
    ActionKind::SetFilterCycle,
    ActionKind::SetCleaningCycle,
    ActionKind::ResetFilter,
    ActionKind::ResetCleaning,
];

/// Actions a device class accepts. Litter boxes and unclassified devices
/// are read-only.
pub fn capabilities(class: DeviceClass) -> &'static [ActionKind] {
    match class {
        DeviceClass::Feeder => FEEDER,
        DeviceClass::CameraFeeder => CAMERA_FEEDER,
        DeviceClass::RfidFeeder => RFID_FEEDER,
        DeviceClass::Fountain | DeviceClass::RfidFountain => FOUNTAIN,
        DeviceClass::LitterBox | DeviceClass::Unclassified => &[],
    }
}

pub fn supports(class: DeviceClass, action: ActionKind) -> bool {
    capabilities(class).contains(&action)
}

#[cfg(test)]
mod tests {
    use super::*;
    use strum::IntoEnumIterator;

    #[test]
    fn read_only_classes_have_no_actions() {
        assert!(capabilities(DeviceClass::Unclassified).is_empty());
        assert!(capabilities(DeviceClass::LitterBox).is_empty());
    }

    #[test]
    fn every_action_has_a_home() {
        for kind in ActionKind::iter() {
            assert!(
                DeviceClass::iter().any(|class| supports(class, kind)),
                "{kind} is not supported by any class"
            );
        }
    }

    #[test]
    fn feeders_and_fountains_do_not_mix() {
        assert!(!supports(DeviceClass::Fountain, ActionKind::DispenseNow));
        assert!(!supports(DeviceClass::Feeder, ActionKind::SetWaterMode));
        assert!(supports(DeviceClass::CameraFeeder, ActionKind::SetVideoRecord));
        assert!(!supports(DeviceClass::Feeder, ActionKind::SetVideoRecord));
    }
}
