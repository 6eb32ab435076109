//! End-to-end flow: hydrate an aggregate lazily, edit it, and persist only
//! the tracked delta into SQLite.

use delta_core::{FetchScope, Identifiable, LazyCollection, LazyValue, Status};
use rusqlite::{params, Connection};
use std::cell::Cell;
use std::rc::Rc;
use uuid::Uuid;

struct Car {
    id: Uuid,
    make: String,
    kms: LazyValue<i64, rusqlite::Error>,
}

impl Car {
    fn new(make: &str, kms: i64) -> Self {
        Self::hydrate(Uuid::new_v4(), make.to_string(), kms)
    }

    fn hydrate(id: Uuid, make: String, kms: i64) -> Self {
        Self {
            id,
            make,
            kms: LazyValue::eager(kms),
        }
    }

    fn kms(&self) -> i64 {
        self.kms.peek().copied().unwrap_or_default()
    }

    fn driven(&self, distance: i64) -> Self {
        let mut car = Self::hydrate(self.id, self.make.clone(), self.kms());
        car.kms.set(self.kms() + distance);
        car
    }
}

impl Identifiable for Car {
    type Id = Uuid;

    fn id(&self) -> Uuid {
        self.id
    }
}

struct Person {
    id: Uuid,
    name: String,
    photo: LazyValue<Vec<u8>, rusqlite::Error>,
    cars: LazyCollection<Car, rusqlite::Error>,
}

struct PersonRepository {
    conn: Rc<Connection>,
    photo_loads: Rc<Cell<usize>>,
}

impl PersonRepository {
    fn new() -> Self {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(
            "CREATE TABLE people (id TEXT PRIMARY KEY, name TEXT NOT NULL, photo BLOB NOT NULL);
             CREATE TABLE cars (
                id TEXT PRIMARY KEY,
                owner_id TEXT NOT NULL,
                make TEXT NOT NULL,
                kms INTEGER NOT NULL
             );",
        )
        .unwrap();
        Self {
            conn: Rc::new(conn),
            photo_loads: Rc::new(Cell::new(0)),
        }
    }

    fn seed(&self, person_id: Uuid, photo: &[u8], cars: &[(Uuid, &str, i64)]) {
        self.conn
            .execute(
                "INSERT INTO people (id, name, photo) VALUES (?1, 'John Doe', ?2)",
                params![person_id.to_string(), photo],
            )
            .unwrap();
        for (id, make, kms) in cars {
            self.conn
                .execute(
                    "INSERT INTO cars (id, owner_id, make, kms) VALUES (?1, ?2, ?3, ?4)",
                    params![id.to_string(), person_id.to_string(), make, kms],
                )
                .unwrap();
        }
    }

    fn load(&self, id: Uuid) -> rusqlite::Result<Person> {
        let name: String = self.conn.query_row(
            "SELECT name FROM people WHERE id = ?1",
            [id.to_string()],
            |row| row.get(0),
        )?;

        let conn = Rc::clone(&self.conn);
        let loads = Rc::clone(&self.photo_loads);
        let photo = LazyValue::new(move || {
            loads.set(loads.get() + 1);
            conn.query_row(
                "SELECT photo FROM people WHERE id = ?1",
                [id.to_string()],
                |row| row.get(0),
            )
        });

        let conn = Rc::clone(&self.conn);
        let cars = LazyCollection::new(move |scope: FetchScope<Uuid>| load_cars(&conn, id, &scope));

        Ok(Person {
            id,
            name,
            photo,
            cars,
        })
    }

    /// Applies the aggregate delta and returns the write statements issued.
    fn update(&self, person: &Person) -> rusqlite::Result<Vec<&'static str>> {
        let mut writes = Vec::new();
        let owner = person.id.to_string();

        self.conn.execute(
            "UPDATE people SET name = ?1 WHERE id = ?2",
            params![person.name, owner],
        )?;
        writes.push("update_person");

        if let Some(change) = person.photo.change() {
            self.conn.execute(
                "UPDATE people SET photo = ?1 WHERE id = ?2",
                params![change.value, owner],
            )?;
            writes.push("update_photo");
        }

        let changes = person.cars.changes();
        if changes.is_reset() {
            self.conn
                .execute("DELETE FROM cars WHERE owner_id = ?1", [&owner])?;
            writes.push("reset_cars");
        }
        for item in changes.iter() {
            match (item.status, item.value) {
                (Status::Removed, _) => {
                    self.conn
                        .execute("DELETE FROM cars WHERE id = ?1", [item.id.to_string()])?;
                    writes.push("delete_car");
                }
                (Status::Added, Some(car)) => {
                    self.conn.execute(
                        "INSERT INTO cars (id, owner_id, make, kms) VALUES (?1, ?2, ?3, ?4)",
                        params![car.id.to_string(), owner, car.make, car.kms()],
                    )?;
                    writes.push("insert_car");
                }
                (Status::Modified, Some(car)) => {
                    let kms = car.kms.change().map(|change| *change.value);
                    self.conn.execute(
                        "UPDATE cars SET make = ?1, kms = COALESCE(?2, kms) WHERE id = ?3",
                        params![car.make, kms, car.id.to_string()],
                    )?;
                    writes.push("update_car");
                }
                _ => {}
            }
        }

        Ok(writes)
    }
}

fn load_cars(
    conn: &Connection,
    owner: Uuid,
    scope: &FetchScope<Uuid>,
) -> rusqlite::Result<Vec<Car>> {
    let car_filter = scope.as_one().map(Uuid::to_string);
    let mut stmt = conn.prepare(
        "SELECT id, make, kms FROM cars
         WHERE owner_id = ?1 AND (?2 IS NULL OR id = ?2)
         ORDER BY make",
    )?;
    let rows = stmt.query_map(params![owner.to_string(), car_filter], |row| {
        Ok((
            row.get::<_, String>(0)?,
            row.get::<_, String>(1)?,
            row.get::<_, i64>(2)?,
        ))
    })?;

    let mut cars = Vec::new();
    for row in rows {
        let (id, make, kms) = row?;
        cars.push(Car::hydrate(Uuid::parse_str(&id).unwrap(), make, kms));
    }
    Ok(cars)
}

fn car_rows(repo: &PersonRepository) -> Vec<(String, i64)> {
    let mut stmt = repo
        .conn
        .prepare("SELECT make, kms FROM cars ORDER BY make")
        .unwrap();
    let rows = stmt
        .query_map([], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?))
        })
        .unwrap();
    rows.collect::<Result<Vec<_>, _>>().unwrap()
}

#[test]
fn incremental_edits_write_only_the_delta() {
    let repo = PersonRepository::new();
    let person_id = Uuid::new_v4();
    let (bmw, audi) = (Uuid::new_v4(), Uuid::new_v4());
    repo.seed(
        person_id,
        b"photo data",
        &[(bmw, "bmw", 10_000), (audi, "audi", 500)],
    );

    let mut person = repo.load(person_id).unwrap();
    person.cars.remove(&bmw);
    person.cars.set(Car::new("toyota", 2_000));
    let driven = person.cars.get(&audi).unwrap().driven(30);
    person.cars.set(driven);

    let writes = repo.update(&person).unwrap();

    assert_eq!(
        writes,
        vec!["update_person", "delete_car", "insert_car", "update_car"]
    );
    assert_eq!(repo.photo_loads.get(), 0);
    assert_eq!(
        car_rows(&repo),
        vec![("audi".to_string(), 530), ("toyota".to_string(), 2_000)]
    );

    let mut reloaded = repo.load(person_id).unwrap();
    assert_eq!(reloaded.photo.get().unwrap(), b"photo data");
    assert_eq!(repo.photo_loads.get(), 1);
    let makes: Vec<_> = reloaded
        .cars
        .get_all()
        .unwrap()
        .map(|car| (car.make.clone(), car.kms()))
        .collect();
    assert_eq!(
        makes,
        vec![("audi".to_string(), 530), ("toyota".to_string(), 2_000)]
    );
}

#[test]
fn reset_replaces_the_whole_collection() {
    let repo = PersonRepository::new();
    let person_id = Uuid::new_v4();
    repo.seed(
        person_id,
        b"old",
        &[(Uuid::new_v4(), "bmw", 1), (Uuid::new_v4(), "audi", 2)],
    );

    let mut person = repo.load(person_id).unwrap();
    person.photo.set(b"new".to_vec());
    person.cars.set_all(vec![Car::new("fiat", 7)]);

    let writes = repo.update(&person).unwrap();

    assert_eq!(
        writes,
        vec!["update_person", "update_photo", "reset_cars", "insert_car"]
    );
    assert_eq!(repo.photo_loads.get(), 0);
    assert_eq!(car_rows(&repo), vec![("fiat".to_string(), 7)]);

    let mut reloaded = repo.load(person_id).unwrap();
    assert_eq!(reloaded.photo.get().unwrap(), b"new");
}

#[test]
fn untouched_aggregate_writes_only_always_saved_fields() {
    let repo = PersonRepository::new();
    let person_id = Uuid::new_v4();
    repo.seed(person_id, b"photo", &[(Uuid::new_v4(), "bmw", 1)]);

    let mut person = repo.load(person_id).unwrap();
    assert_eq!(person.cars.get_all().unwrap().count(), 1);
    person.name = "Jane Doe".to_string();

    let writes = repo.update(&person).unwrap();

    assert_eq!(writes, vec!["update_person"]);
    assert!(!person.cars.changes().has_changes());
}
