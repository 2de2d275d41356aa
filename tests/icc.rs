use jxl_aux::bitio::{BitWriter, Bitstream};
use jxl_aux::icc::{encode_icc, predict_icc, read_icc, unpredict_icc, IccReader};

fn append_tag(table: &mut Vec<u8>, sig: &[u8; 4], start: u32, size: u32) {
    table.extend_from_slice(sig);
    table.extend_from_slice(&start.to_be_bytes());
    table.extend_from_slice(&size.to_be_bytes());
}

fn xyz_block(x: u32, y: u32, z: u32) -> Vec<u8> {
    let mut block = b"XYZ \0\0\0\0".to_vec();
    block.extend_from_slice(&x.to_be_bytes());
    block.extend_from_slice(&y.to_be_bytes());
    block.extend_from_slice(&z.to_be_bytes());
    block
}

/// A display profile with the structure real profiles have: an mluc
/// description, a white point, an XYZ matrix triple, a shared TRC curve
/// triple, a chromatic adaptation matrix and a copyright string.
fn synthetic_profile() -> Vec<u8> {
    let num_tags = 10u32;
    let data_start = 128 + 4 + num_tags * 12;

    let mut table = Vec::new();
    let mut body = Vec::new();

    // desc
    let text: Vec<u8> = "example profile!".bytes().flat_map(|b| [0, b]).collect();
    let mut mluc = b"mluc\0\0\0\0".to_vec();
    mluc.extend_from_slice(&1u32.to_be_bytes());
    mluc.extend_from_slice(&12u32.to_be_bytes());
    mluc.extend_from_slice(b"enUS");
    mluc.extend_from_slice(&(text.len() as u32).to_be_bytes());
    mluc.extend_from_slice(&28u32.to_be_bytes());
    mluc.extend_from_slice(&text);
    append_tag(&mut table, b"desc", data_start + body.len() as u32, mluc.len() as u32);
    body.extend_from_slice(&mluc);

    // wtpt
    append_tag(&mut table, b"wtpt", data_start + body.len() as u32, 20);
    body.extend_from_slice(&xyz_block(0xf6d6, 0x10000, 0xd32d));

    // rXYZ + gXYZ + bXYZ, consecutive blocks of equal size
    for (sig, x) in [(b"rXYZ", 0x6fa2u32), (b"gXYZ", 0x6299), (b"bXYZ", 0x24a0)] {
        append_tag(&mut table, sig, data_start + body.len() as u32, 20);
        body.extend_from_slice(&xyz_block(x, x / 2, x / 3));
    }

    // rTRC + gTRC + bTRC, all pointing at one curv block
    let curv_start = data_start + body.len() as u32;
    let curv_size = 12 + 64 * 2;
    for sig in [b"rTRC", b"gTRC", b"bTRC"] {
        append_tag(&mut table, sig, curv_start, curv_size);
    }
    body.extend_from_slice(b"curv\0\0\0\0");
    body.extend_from_slice(&64u32.to_be_bytes());
    for i in 0u32..64 {
        body.extend_from_slice(&((i * i * 65535 / (63 * 63)) as u16).to_be_bytes());
    }

    // chad
    append_tag(&mut table, b"chad", data_start + body.len() as u32, 8 + 36);
    body.extend_from_slice(b"sf32\0\0\0\0");
    for v in [0x10000u32, 0, 0, 0, 0x10000, 0, 0, 0, 0x10000] {
        body.extend_from_slice(&v.to_be_bytes());
    }

    // cprt
    let copyright = b"copyright 2026.";
    append_tag(
        &mut table,
        b"cprt",
        data_start + body.len() as u32,
        8 + copyright.len() as u32,
    );
    body.extend_from_slice(b"text\0\0\0\0");
    body.extend_from_slice(copyright);

    let total = data_start as usize + body.len();
    let mut icc = vec![0u8; 128];
    icc[0..4].copy_from_slice(&(total as u32).to_be_bytes());
    icc[4..8].copy_from_slice(b"appl");
    icc[8] = 4;
    icc[12..24].copy_from_slice(b"mntrRGB XYZ ");
    icc[36..40].copy_from_slice(b"acsp");
    icc[40..44].copy_from_slice(b"APPL");
    icc[80..84].copy_from_slice(b"appl");
    icc.extend_from_slice(&num_tags.to_be_bytes());
    icc.extend_from_slice(&table);
    icc.extend_from_slice(&body);
    assert_eq!(icc.len(), total);
    icc
}

#[test]
fn predict_round_trip() {
    let icc = synthetic_profile();
    let enc = predict_icc(&icc).unwrap();
    assert_eq!(unpredict_icc(&enc).unwrap(), icc);
}

#[test]
fn entropy_round_trip() {
    let icc = synthetic_profile();
    let mut writer = BitWriter::new();
    encode_icc(&icc, &mut writer).unwrap();
    let bits_written = writer.num_written_bits();
    let buf = writer.finish();

    let mut bitstream = Bitstream::new(&buf);
    assert_eq!(read_icc(&mut bitstream).unwrap(), icc);
    assert_eq!(bitstream.num_read_bits(), bits_written);
}

#[test]
fn streaming_resume() {
    let icc = synthetic_profile();
    let mut writer = BitWriter::new();
    encode_icc(&icc, &mut writer).unwrap();
    let buf = writer.finish();

    // Feed the stream in growing prefixes; every failure must be a
    // resumable end-of-stream condition.
    let mut reader = IccReader::new();
    let mut initialized = false;
    let mut decoded = None;
    for len in (0..=buf.len()).step_by(64).chain([buf.len()]) {
        let mut bitstream = Bitstream::new(&buf[..len]);
        if !initialized {
            match reader.init(&mut bitstream) {
                Ok(()) => initialized = true,
                Err(err) => {
                    assert!(err.unexpected_eof());
                    continue;
                },
            }
        } else if let Err(err) = reader.init(&mut bitstream) {
            assert!(err.unexpected_eof());
            continue;
        }
        match reader.process(&mut bitstream) {
            Ok(profile) => {
                decoded = Some(profile);
                break;
            },
            Err(err) => assert!(err.unexpected_eof()),
        }
    }
    assert_eq!(decoded.as_deref(), Some(&icc[..]));
}

#[test]
fn damaged_stream_rejected() {
    let icc = synthetic_profile();
    let enc = predict_icc(&icc).unwrap();

    // Losing the final data byte breaks the exact-consumption invariant.
    assert!(unpredict_icc(&enc[..enc.len() - 1]).is_err());

    // A wrong output size never round-trips to a profile of another size.
    let mut wrong_size = enc.clone();
    wrong_size[0] = wrong_size[0].wrapping_add(1);
    match unpredict_icc(&wrong_size) {
        Ok(decoded) => assert_ne!(decoded, icc),
        Err(_) => {},
    }
}
