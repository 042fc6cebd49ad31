//! Shopping Trip
//!
//! A small shop-visit workflow on the blocking engine:
//! - entering a store forwards the trigger so the store name is recorded
//!   by the state just entered
//! - the `OutsideOfStore` entry notification is guarded on "unpaid items
//!   left in the basket"
//!
//! Run with: cargo run --example store_trip

use std::sync::{Arc, Mutex};

use trigfsm::{token_enum, StateEntered, StateExited, StateMachine};
use uuid::Uuid;

token_enum! {
    enum StoreState {
        OutsideOfStore,
        EnterStore,
        ItemsInBasket,
        Checkout,
    }
}

#[derive(Clone)]
struct Item {
    id: Uuid,
    store: String,
}

impl Item {
    fn new(store: &str) -> Self {
        Self {
            id: Uuid::new_v4(),
            store: store.to_string(),
        }
    }
}

struct EnterStoreTrigger {
    store_name: String,
}

struct AddItemToBasket {
    item: Item,
}

struct GotoCheckout;

struct PayForItems;

struct LeaveStore;

/// Caller-owned domain data the handlers read and write.
#[derive(Default)]
struct Ledger {
    last_store: String,
    unpaid: Vec<Item>,
}

fn build_machine(ledger: &Arc<Mutex<Ledger>>) -> StateMachine<StoreState> {
    let machine = StateMachine::new(StoreState::OutsideOfStore);

    let guard_ledger = Arc::clone(ledger);
    machine
        .configure(StoreState::OutsideOfStore)
        .act_if(
            move || {
                let ledger = guard_ledger.lock().unwrap();
                ledger.unpaid.iter().any(|item| item.store == ledger.last_store)
            },
            |_: &StateEntered| println!("Outside of the store with unpaid items! Thief!"),
        )
        .transition_to::<EnterStoreTrigger>(StoreState::EnterStore)
        .act(|_: &StateExited| println!("Exiting the OutsideOfStore state"));

    let enter_ledger = Arc::clone(ledger);
    machine
        .configure(StoreState::EnterStore)
        .act(move |trigger: &EnterStoreTrigger| {
            enter_ledger.lock().unwrap().last_store = trigger.store_name.clone();
            println!("Entering store {}", trigger.store_name);
        })
        .transition_to::<AddItemToBasket>(StoreState::ItemsInBasket)
        .transition_to::<LeaveStore>(StoreState::OutsideOfStore);

    let basket_ledger = Arc::clone(ledger);
    machine
        .configure(StoreState::ItemsInBasket)
        .act(move |trigger: &AddItemToBasket| {
            basket_ledger.lock().unwrap().unpaid.push(trigger.item.clone());
            println!("Obtained item {}", trigger.item.id);
        })
        .transition_to::<GotoCheckout>(StoreState::Checkout)
        .transition_to::<LeaveStore>(StoreState::OutsideOfStore);

    let checkout_ledger = Arc::clone(ledger);
    machine
        .configure(StoreState::Checkout)
        .on(move |_: &PayForItems| {
            let mut ledger = checkout_ledger.lock().unwrap();
            let store = ledger.last_store.clone();
            ledger.unpaid.retain(|item| item.store != store);
            println!("Paid for your items like a good person");
            StoreState::OutsideOfStore
        })
        .transition_to::<LeaveStore>(StoreState::OutsideOfStore);

    machine
}

fn main() {
    env_logger::init();

    let ledger = Arc::new(Mutex::new(Ledger::default()));
    let machine = build_machine(&ledger);
    machine.start();

    let store_name = "Shopaporium";

    // First trip: walk out without paying.
    machine.dispatch(&EnterStoreTrigger {
        store_name: store_name.to_string(),
    });
    machine.dispatch(&AddItemToBasket {
        item: Item::new(store_name),
    });
    machine.dispatch(&AddItemToBasket {
        item: Item::new(store_name),
    });
    machine.dispatch(&LeaveStore);

    // Second trip: pay at the checkout before leaving.
    machine.dispatch(&EnterStoreTrigger {
        store_name: store_name.to_string(),
    });
    machine.dispatch(&AddItemToBasket {
        item: Item::new(store_name),
    });
    machine.dispatch(&AddItemToBasket {
        item: Item::new(store_name),
    });
    machine.dispatch(&GotoCheckout);
    machine.dispatch(&PayForItems);
    machine.dispatch(&LeaveStore);

    println!(
        "Trip over in state {:?}, {} unpaid item(s) left",
        machine.current(),
        ledger.lock().unwrap().unpaid.len()
    );
}
