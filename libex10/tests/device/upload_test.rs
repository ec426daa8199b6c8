use libex10::constants::UPLOAD_CHUNK_SIZE;
use libex10::test_support::{SimRig, fast_config, protocol_rig};
use libex10::transport::SimulatedEx10;
use libex10::types::CommandCode;
use libex10::{Error, ErrorKind, Module, RunLocation};

use crate::common::{init_logging, sample_image};

fn bootloader_rig() -> SimRig {
    protocol_rig(SimulatedEx10::new().in_bootloader(), &fast_config()).unwrap()
}

#[test]
fn image_is_sent_in_fixed_chunks() {
    init_logging();
    let rig = bootloader_rig();
    let image = sample_image(UPLOAD_CHUNK_SIZE * 2 + 17);
    rig.protocol.upload_image(0, &image).unwrap();

    let uploads = rig.sim.completed_uploads();
    assert_eq!(uploads.len(), 1);
    assert_eq!(uploads[0].data, image);
    assert_eq!(uploads[0].chunks, 3);
    assert_eq!(rig.sim.count_commands(CommandCode::StartUpload), 1);
    assert_eq!(rig.sim.count_commands(CommandCode::ContinueUpload), 2);
}

#[test]
fn rejected_chunk_aborts_the_upload() {
    let rig = bootloader_rig();
    rig.sim.fail_upload_chunk(1);
    let image = sample_image(UPLOAD_CHUNK_SIZE * 3);

    assert!(matches!(
        rig.protocol.upload_image(0, &image),
        Err(Error::CommandsNoResponse(_))
    ));
    assert_eq!(rig.sim.count_commands(CommandCode::CompleteUpload), 0);
    assert!(rig.sim.completed_uploads().is_empty());
    assert!(!rig.protocol.upload_progress().is_active());
}

#[test]
fn streamed_upload_tracks_progress() {
    let rig = bootloader_rig();
    let image = sample_image(3000);
    let (first, rest) = image.split_at(UPLOAD_CHUNK_SIZE);

    rig.protocol.upload_start(0, image.len(), first).unwrap();
    assert_eq!(rig.protocol.upload_progress().remaining, 3000 - UPLOAD_CHUNK_SIZE);
    for chunk in rest.chunks(UPLOAD_CHUNK_SIZE) {
        rig.protocol.upload_continue(chunk).unwrap();
    }
    assert_eq!(rig.protocol.upload_progress().remaining, 0);
    rig.protocol.upload_complete().unwrap();
    assert!(!rig.protocol.upload_progress().is_active());
    assert_eq!(rig.sim.completed_uploads()[0].data, image);
}

#[test]
fn oversized_continue_abandons_the_session() {
    let rig = bootloader_rig();
    let image = sample_image(1200);
    rig.protocol.upload_start(0, image.len(), &image[..1000]).unwrap();

    let err = rig.protocol.upload_continue(&image[..300]).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::BadParamValue);
    assert!(!rig.protocol.upload_progress().is_active());

    // nothing left to continue
    assert!(matches!(
        rig.protocol.upload_continue(&image[1000..]),
        Err(Error::BadParamValue {
            module: Module::Protocol,
            ..
        })
    ));
}

#[test]
fn upload_requires_the_bootloader() {
    let rig = protocol_rig(SimulatedEx10::new(), &fast_config()).unwrap();
    assert!(matches!(
        rig.protocol.upload_image(0, &sample_image(64)),
        Err(Error::RunLocation {
            expected: RunLocation::Bootloader,
            actual: Some(RunLocation::Application),
            ..
        })
    ));
    assert_eq!(rig.sim.count_commands(CommandCode::StartUpload), 0);
}

#[test]
fn upload_then_reset_runs_new_application() {
    let sim = SimulatedEx10::new().without_application_image().in_bootloader();
    let rig = protocol_rig(sim.clone(), &fast_config()).unwrap();
    rig.protocol.upload_image(0, &sample_image(2048)).unwrap();
    rig.protocol.reset(RunLocation::Application).unwrap();
    assert_eq!(sim.run_location(), Some(RunLocation::Application));
}
