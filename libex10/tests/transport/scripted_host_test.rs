use std::sync::Arc;

use libex10::device::Ex10Commands;
use libex10::protocol::CommandTransactor;
use libex10::registers::application;
use libex10::transport::{MockGpio, ScriptedHost};
use libex10::types::{FifoSelection, HostResultCode};
use libex10::Error;

fn commands(host: &ScriptedHost) -> Ex10Commands {
    let mut commands = Ex10Commands::new(CommandTransactor::new());
    commands.init(Arc::new(MockGpio::new()), Box::new(host.clone()));
    commands
}

#[test]
fn register_read_frame_on_the_wire() -> anyhow::Result<()> {
    let host = ScriptedHost::new();
    host.push_response(hex::decode("a50100")?);
    let mut cmds = commands(&host);

    let mut status = [0u8; 2];
    cmds.read(&[application::STATUS], &mut [&mut status], 10)?;
    assert_eq!(status, [0x01, 0x00]);

    // Read, address 0x0006, length 2
    assert_eq!(host.sent(), vec![hex::decode("0106000200")?]);
    Ok(())
}

#[test]
fn multi_register_write_is_one_frame() -> anyhow::Result<()> {
    let host = ScriptedHost::new();
    let mut cmds = commands(&host);
    cmds.write(
        &[application::INTERRUPT_MASK, application::EVENT_FIFO_INT_LEVEL],
        &[&[0x01, 0x00, 0x00, 0x00], &[0x00, 0x08]],
        10,
    )?;
    let int_level = application::EVENT_FIFO_INT_LEVEL.address.to_le_bytes();
    let mut expected = hex::decode("02a000040001000000")?;
    expected.extend_from_slice(&int_level);
    expected.extend_from_slice(&[0x02, 0x00, 0x00, 0x08]);
    assert_eq!(host.sent(), vec![expected]);
    Ok(())
}

#[test]
fn short_response_is_a_length_error() {
    let host = ScriptedHost::new();
    host.push_response(vec![0xa5, 0x01]);
    let mut cmds = commands(&host);

    let mut status = [0u8; 2];
    match cmds.read(&[application::STATUS], &mut [&mut status], 10) {
        Err(Error::CommandsWithResponse { host_result, .. }) => {
            assert_eq!(host_result, HostResultCode::ReceivedLengthIncorrect)
        }
        other => panic!("unexpected: {:?}", other),
    }
}

#[test]
fn host_failure_surfaces_errno() {
    let host = ScriptedHost::new();
    host.fail_next_read(-5);
    let mut cmds = commands(&host);

    let mut dest = [0u8; 8];
    assert!(matches!(
        cmds.read_fifo(FifoSelection::EventFifo, &mut dest),
        Err(Error::HostInterface { status: -5, .. })
    ));
}

#[test]
fn partial_write_is_reported() {
    let host = ScriptedHost::new();
    host.truncate_writes_to(2);
    let mut cmds = commands(&host);
    assert!(matches!(
        cmds.write(&[application::INTERRUPT_MASK], &[&[0u8; 4]], 10),
        Err(Error::UnexpectedTxLength { expected: 9, actual: 2, .. })
    ));
}
