// CLASSIFICATION: COMMUNITY
// Filename: prmd_mailbox.rs v0.2
// Author: Lukas Bower
// Date Modified: 2026-10-19

use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use emu_host::efi::{EfiError, EfiStatus, Guid};
use emu_host::prmd::{
    HandlerTable, MailboxConsumer, PrmHandler, PrmdFunction, PrmdProducer, PrmdRequest, PrmdResponse,
    PrmdServiceThunk, INVOKE_HEADER_SIZE, PRMD_HEADER_SIZE, PRMD_MAILBOX_SIZE,
};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

const ROUNDS: usize = 1000;
const SEED: u64 = 0x5052_4d44;
const MAX_PARAMS: usize = PRMD_MAILBOX_SIZE - PRMD_HEADER_SIZE - INVOKE_HEADER_SIZE;

fn expected(rng: &mut StdRng) -> (Guid, Vec<u8>) {
    let guid = Guid::from_fields(rng.gen(), rng.gen(), rng.gen(), rng.gen());
    let len = rng.gen_range(0..=MAX_PARAMS);
    let mut params = vec![0u8; len];
    rng.fill(params.as_mut_slice());
    (guid, params)
}

fn status_for(round: usize) -> EfiStatus {
    if round % 3 == 0 {
        EfiStatus::SUCCESS
    } else {
        EfiStatus::error(round)
    }
}

#[test]
fn thousand_round_trips_stay_consistent() {
    let thunk = Arc::new(PrmdServiceThunk::open(0).unwrap());

    let consumer = {
        let thunk = Arc::clone(&thunk);
        thread::spawn(move || {
            let mut rng = StdRng::seed_from_u64(SEED);
            for round in 0..ROUNDS {
                let (guid, params) = expected(&mut rng);
                thunk.wait_for_message().unwrap();
                let mut mailbox = thunk.acquire_mailbox().unwrap();
                assert_eq!(mailbox.function(), PrmdFunction::InvokeHandler.code());
                assert_eq!(
                    PrmdRequest::decode(&mailbox).unwrap(),
                    PrmdRequest::InvokeHandler {
                        guid,
                        parameters: params
                    },
                    "round {round}"
                );
                mailbox.set_status(status_for(round));
                thunk.release_mailbox(mailbox).unwrap();
                thunk.message_response_ready();
            }
        })
    };

    let mut rng = StdRng::seed_from_u64(SEED);
    for round in 0..ROUNDS {
        let (guid, parameters) = expected(&mut rng);
        let mut mailbox = thunk.acquire_mailbox().unwrap();
        mailbox.clear();
        PrmdRequest::InvokeHandler { guid, parameters }
            .encode(&mut mailbox)
            .unwrap();
        thunk.release_mailbox(mailbox).unwrap();
        thunk.signal_message_is_ready();
        thunk.wait_for_response(Some(Duration::from_secs(10))).unwrap();

        let mailbox = thunk.acquire_mailbox().unwrap();
        assert_eq!(mailbox.status(), status_for(round), "round {round}");
        thunk.release_mailbox(mailbox).unwrap();
    }
    consumer.join().unwrap();
}

#[test]
fn producer_round_trip_carries_modified_parameters() {
    let thunk = Arc::new(PrmdServiceThunk::open(0).unwrap());
    let consumer = {
        let thunk = Arc::clone(&thunk);
        thread::spawn(move || {
            thunk.wait_for_message().unwrap();
            let mut mailbox = thunk.acquire_mailbox().unwrap();
            let PrmdRequest::InvokeHandler { mut parameters, .. } = PrmdRequest::decode(&mailbox).unwrap() else {
                panic!("unexpected request");
            };
            parameters.reverse();
            PrmdResponse::Invoke {
                handler_status: EfiStatus::DEVICE_ERROR,
                parameters,
            }
            .encode(&mut mailbox)
            .unwrap();
            mailbox.set_status(EfiStatus::SUCCESS);
            mailbox.mark_answered();
            thunk.message_response_ready();
            thunk.release_mailbox(mailbox).unwrap();
        })
    };

    let producer = PrmdProducer::new(thunk, Some(Duration::from_secs(10)));
    let guid = "a5f1c2d3-0001-4b2c-8d3e-00000000beef".parse().unwrap();
    let response = producer
        .round_trip(&PrmdRequest::InvokeHandler {
            guid,
            parameters: vec![1, 2, 3],
        })
        .unwrap();
    assert_eq!(
        response,
        PrmdResponse::Invoke {
            handler_status: EfiStatus::DEVICE_ERROR,
            parameters: vec![3, 2, 1]
        }
    );
    consumer.join().unwrap();
}

#[test]
fn parameters_one_past_capacity_rejected() {
    let thunk = Arc::new(PrmdServiceThunk::open(0).unwrap());
    let producer = PrmdProducer::new(Arc::clone(&thunk), None);
    let request = PrmdRequest::InvokeHandler {
        guid: Guid::default(),
        parameters: vec![0; MAX_PARAMS + 1],
    };
    assert_eq!(producer.round_trip(&request), Err(EfiError::BadBufferSize));
    assert_eq!(thunk.mailbox().acquisitions(), 0);
}

#[test]
fn timed_out_request_does_not_answer_the_next() {
    let thunk = Arc::new(PrmdServiceThunk::open(0).unwrap());
    let guid: Guid = "a5f1c2d3-0001-4b2c-8d3e-00000000beef".parse().unwrap();
    let invoke = |parameters: Vec<u8>| PrmdRequest::InvokeHandler { guid, parameters };

    let impatient = PrmdProducer::new(Arc::clone(&thunk), Some(Duration::from_millis(20)));
    assert_eq!(impatient.round_trip(&invoke(vec![0xAA])), Err(EfiError::Timeout));

    // the first request is answered after its caller gave up
    let mut mailbox = thunk.acquire_mailbox().unwrap();
    mailbox.set_status(EfiStatus::SUCCESS);
    mailbox.mark_answered();
    thunk.release_mailbox(mailbox).unwrap();

    let second = {
        let producer = PrmdProducer::new(Arc::clone(&thunk), Some(Duration::from_secs(5)));
        let request = invoke(vec![1, 2, 3]);
        thread::spawn(move || producer.round_trip(&request))
    };
    let deadline = Instant::now() + Duration::from_secs(5);
    while thunk.mailbox().acquisitions() < 3 && Instant::now() < deadline {
        thread::sleep(Duration::from_millis(1));
    }
    thread::sleep(Duration::from_millis(50));
    // late wake-up belonging to the first request
    thunk.message_response_ready();

    let mut table = HandlerTable::new();
    table.insert(PrmHandler::new(guid, "Doubler", Vec::new(), |buffer: &mut [u8]| {
        for byte in buffer.iter_mut() {
            *byte *= 2;
        }
        EfiStatus::SUCCESS
    }));
    let mut consumer = MailboxConsumer::new(Arc::clone(&thunk), table);
    assert_eq!(consumer.serve_within(Duration::from_secs(5)), Ok(true));

    assert_eq!(
        second.join().unwrap(),
        Ok(PrmdResponse::Invoke {
            handler_status: EfiStatus::SUCCESS,
            parameters: vec![2, 4, 6],
        })
    );
}
